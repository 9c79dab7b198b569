use axum::{extract::Extension, response::Response, Json};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use serde::Deserialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::api::{
    email::{password_reset_message, Mailer},
    response::{self, ErrorCode},
    storage::AccountStore,
    validation::{fire, Rule},
};

const TEMP_PASSWORD_LEN: usize = 16;

/// Password-reset payload. `user_id` also accepts the account email.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct PasswordResetRequest {
    user_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/v1/account/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset mail sent, secret replaced"),
        (status = 400, description = "Unknown identifier or mail delivery failure"),
    ),
    tag = "account"
)]
#[instrument(skip(accounts, mailer, payload))]
pub async fn password_reset(
    accounts: Extension<AccountStore>,
    mailer: Extension<Mailer>,
    payload: Option<Json<PasswordResetRequest>>,
) -> Response {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => return response::bad_request(vec![ErrorCode::RequiredParam]),
    };

    let Some(user_id) = request.user_id else {
        return response::bad_request(vec![ErrorCode::RequiredParam]);
    };

    if !fire(&user_id, Rule::UserIdOrEmail) {
        return response::bad_request(vec![ErrorCode::ValidationUserId]);
    }

    // Soft-deleted accounts do not resolve even though their rows exist.
    let account = match accounts.resolve_active(&user_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return response::bad_request(vec![ErrorCode::UnknownUser]),
        Err(e) => {
            error!("Error resolving account: {e:?}");
            return response::internal_error();
        }
    };

    let temp_password = generate_temp_password();
    let message = password_reset_message(&account.email, &account.user_name, &temp_password);

    // Mail first: a delivery failure leaves the old password valid, so the
    // caller can simply retry.
    if let Err(e) = mailer.send(&message).await {
        error!("Error sending reset mail: {e:?}");
        return response::bad_request(vec![ErrorCode::MailSendFailure]);
    }

    if let Err(e) = accounts.replace_password(account.id, &temp_password).await {
        // The mail already went out with a password that never took effect;
        // the account keeps its old secret.
        error!("Error replacing password after reset mail: {e:?}");
        return response::internal_error();
    }

    info!("password reset completed for account {}", account.id);

    response::ok_empty()
}

fn generate_temp_password() -> String {
    OsRng
        .sample_iter(Alphanumeric)
        .take(TEMP_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_password_is_alphanumeric_and_sized() {
        let password = generate_temp_password();
        assert_eq!(password.len(), TEMP_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn temp_passwords_differ() {
        assert_ne!(generate_temp_password(), generate_temp_password());
    }

    #[test]
    fn missing_user_id_deserializes_to_none() {
        let request: PasswordResetRequest =
            serde_json::from_value(serde_json::json!({})).expect("empty body should deserialize");
        assert!(request.user_id.is_none());
    }
}
