use axum::{extract::Extension, response::Response, Json};
use serde::Deserialize;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::api::{
    response::{self, ErrorCode, TokenData},
    storage::{AccountStore, TokenStore},
    validation::{failed_checks, fire, Rule},
};

/// Sign-in payload. `user_id` also accepts the account email.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    user_id: Option<String>,
    password: Option<String>,
}

fn format_errors(user_id: &str, password: &str) -> Vec<ErrorCode> {
    failed_checks(&[
        (ErrorCode::ValidationUserId, fire(user_id, Rule::UserIdOrEmail)),
        (ErrorCode::ValidationPassword, fire(password, Rule::Password)),
    ])
}

#[utoipa::path(
    post,
    path = "/v1/account/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Session token issued", body = TokenData),
        (status = 400, description = "Missing or malformed fields, or unknown credentials"),
    ),
    tag = "account"
)]
#[instrument(skip(accounts, tokens, payload))]
pub async fn sign_in(
    accounts: Extension<AccountStore>,
    tokens: Extension<TokenStore>,
    payload: Option<Json<SignInRequest>>,
) -> Response {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let (Some(user_id), Some(password)) = (request.user_id, request.password) else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    let errors = format_errors(&user_id, &password);
    if !errors.is_empty() {
        return response::bad_request(errors);
    }

    // One combined resolve-and-verify: an unknown identifier and a wrong
    // password are indistinguishable to the caller.
    let account_id = match accounts.verify_credentials(&user_id, &password).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            debug!("credential verification failed");
            return response::bad_request(vec![ErrorCode::UnknownUser]);
        }
        Err(e) => {
            error!("Error verifying credentials: {e:?}");
            return response::internal_error();
        }
    };

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

    #[test]
    fn format_errors_accept_user_id_or_email() {
        assert!(format_errors("alice_01", "passw0rd").is_empty());
        assert!(format_errors("alice@example.com", "passw0rd").is_empty());
    }

    #[test]
    fn format_errors_aggregate_both_fields() {
        assert_eq!(
            format_errors("a b", "short"),
            vec![ErrorCode::ValidationUserId, ErrorCode::ValidationPassword]
        );
    }

    #[test]
    fn missing_password_deserializes_to_none() {
        let request: SignInRequest =
            serde_json::from_value(serde_json::json!({ "user_id": "alice_01" }))
                .expect("partial body should deserialize");
        assert!(request.password.is_none());
    }
}
