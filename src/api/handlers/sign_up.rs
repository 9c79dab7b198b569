use axum::{extract::Extension, response::Response, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::api::{
    response::{self, ErrorCode, TokenData},
    storage::{AccountStore, CreateOutcome, NewAccount, TokenStore},
    validation::{failed_checks, fire, Rule},
};

/// Sign-up payload. Fields stay optional so the presence gate can tell
/// "missing" apart from "present but malformed"; unknown keys are
/// rejected at the boundary.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct SignUpRequest {
    user_id: Option<String>,
    user_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    gender: Option<String>,
    birthday: Option<String>,
}

struct SignUpFields {
    user_id: String,
    user_name: String,
    email: String,
    password: String,
    gender: String,
    birthday: String,
}

impl SignUpRequest {
    /// Presence gate: all six fields or nothing.
    fn require(self) -> Option<SignUpFields> {
        Some(SignUpFields {
            user_id: self.user_id?,
            user_name: self.user_name?,
            email: self.email?,
            password: self.password?,
            gender: self.gender?,
            birthday: self.birthday?,
        })
    }
}

/// Format gate: every rule runs; failures keep field order.
fn format_errors(fields: &SignUpFields) -> Vec<ErrorCode> {
    failed_checks(&[
        (ErrorCode::ValidationUserId, fire(&fields.user_id, Rule::UserId)),
        (
            ErrorCode::ValidationUserName,
            fire(&fields.user_name, Rule::UserName),
        ),
        (ErrorCode::ValidationEmail, fire(&fields.email, Rule::Email)),
        (
            ErrorCode::ValidationPassword,
            fire(&fields.password, Rule::Password),
        ),
        (ErrorCode::ValidationGender, fire(&fields.gender, Rule::Gender)),
        (
            ErrorCode::ValidationBirthday,
            fire(&fields.birthday, Rule::Date),
        ),
    ])
}

#[utoipa::path(
    post,
    path = "/v1/account/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Account created, session token issued", body = TokenData),
        (status = 400, description = "Missing, malformed, or already-taken fields; codes in message"),
    ),
    tag = "account"
)]
#[instrument(skip(accounts, tokens, payload))]
pub async fn sign_up(
    accounts: Extension<AccountStore>,
    tokens: Extension<TokenStore>,
    payload: Option<Json<SignUpRequest>>,
) -> Response {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let Some(fields) = request.require() else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    let errors = format_errors(&fields);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    // Both existence checks run; conflicts aggregate in field order.
    let user_id_taken = match accounts.exists_by_user_id(&fields.user_id).await {
        Ok(taken) => taken,
        Err(e) => {
            error!("Error checking user_id: {e:?}");
            return response::internal_error();
        }
    };
    let email_taken = match accounts.exists_by_email(&fields.email).await {
        Ok(taken) => taken,
        Err(e) => {
            error!("Error checking email: {e:?}");
            return response::internal_error();
        }
    };

    let errors = failed_checks(&[
        (ErrorCode::AlreadyUserId, !user_id_taken),
        (ErrorCode::AlreadyEmail, !email_taken),
    ]);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    // The format gate already proved this parses.
    let Ok(birthday) = NaiveDate::parse_from_str(&fields.birthday, "%Y-%m-%d") else {
        return response::bad_request(vec![ErrorCode::ValidationBirthday]);
    };

    let new_account = NewAccount {
        user_id: &fields.user_id,
        user_name: &fields.user_name,
        email: &fields.email,
        password: &fields.password,
        gender: &fields.gender,
        birthday,
    };

    // The unique indexes still arbitrate races the pre-checks missed.
    let account_id = match accounts.create(&new_account).await {
        Ok(CreateOutcome::Created(id)) => id,
        Ok(CreateOutcome::DuplicateUserId) => {
            return response::bad_request(vec![ErrorCode::AlreadyUserId])
        }
        Ok(CreateOutcome::DuplicateEmail) => {
            return response::bad_request(vec![ErrorCode::AlreadyEmail])
        }
        Err(e) => {
            error!("Error creating account: {e:?}");
            return response::internal_error();
        }
    };

    debug!("account created: {account_id}");

    match tokens.issue(account_id).await {
        Ok(token) => response::ok(TokenData { token }),
        Err(e) => {
            error!("Error issuing token: {e:?}");
            response::internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> SignUpRequest {
        SignUpRequest {
            user_id: Some("alice_01".to_string()),
            user_name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            password: Some("passw0rd".to_string()),
            gender: Some("female".to_string()),
            birthday: Some("1990-04-01".to_string()),
        }
    }

    #[test]
    fn require_passes_when_all_present() {
        assert!(full_request().require().is_some());
    }

    #[test]
    fn require_fails_when_any_field_missing() {
        let mut request = full_request();
        request.email = None;
        assert!(request.require().is_none());

        let mut request = full_request();
        request.birthday = None;
        assert!(request.require().is_none());
    }

    #[test]
    fn empty_string_is_present_but_malformed() {
        // "" is not "missing": it passes the presence gate and fails format.
        let mut request = full_request();
        request.user_id = Some(String::new());
        let fields = request.require().expect("presence gate should pass");
        assert_eq!(format_errors(&fields), vec![ErrorCode::ValidationUserId]);
    }

    #[test]
    fn format_errors_empty_for_valid_fields() {
        let fields = full_request().require().expect("all fields present");
        assert!(format_errors(&fields).is_empty());
    }

    #[test]
    fn format_errors_aggregate_in_field_order() {
        let mut request = full_request();
        request.user_id = Some("a".to_string());
        request.password = Some("short".to_string());
        request.birthday = Some("1990-13-01".to_string());
        let fields = request.require().expect("all fields present");
        assert_eq!(
            format_errors(&fields),
            vec![
                ErrorCode::ValidationUserId,
                ErrorCode::ValidationPassword,
                ErrorCode::ValidationBirthday,
            ]
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_json::from_value::<SignUpRequest>(serde_json::json!({
            "user_id": "alice_01",
            "role": "admin",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn missing_keys_deserialize_to_none() {
        let request: SignUpRequest =
            serde_json::from_value(serde_json::json!({ "user_id": "alice_01" }))
                .expect("partial body should deserialize");
        assert_eq!(request.user_id.as_deref(), Some("alice_01"));
        assert!(request.email.is_none());
    }
}
