//! Response envelope shared by every endpoint.
//!
//! `{status, message, data}`: `message` is null on success and an ordered
//! list of stable error codes on failure. The HTTP status mirrors the
//! envelope status so clients can rely on either.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Closed set of error codes carried in the envelope message list.
///
/// Codes are part of the wire contract; the serialized form is the
/// kebab-case string, never a free-text message.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    RequiredParam,
    ValidationUserId,
    ValidationUserName,
    ValidationEmail,
    ValidationPassword,
    ValidationGender,
    ValidationBirthday,
    ValidationBloodType,
    ValidationVaccineName,
    ValidationVisitDate,
    ValidationAllergyName,
    ValidationMeasurement,
    ValidationClothesSize,
    ValidationShoesSize,
    ValidationRecordedOn,
    AlreadyUserId,
    AlreadyEmail,
    UnknownUser,
    UnknownChild,
    UnknownVaccination,
    UnknownAllergy,
    MailSendFailure,
    Unauthorized,
    InternalError,
}

#[derive(Serialize, Debug)]
pub struct Envelope<T: Serialize> {
    pub status: u16,
    pub message: Option<Vec<ErrorCode>>,
    pub data: Option<T>,
}

/// Session token returned by sign-up and sign-in.
#[derive(ToSchema, Serialize, Debug)]
pub struct TokenData {
    pub token: String,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope {
            status: 200,
            message: None,
            data: Some(data),
        }),
    )
        .into_response()
}

/// Success with no payload (password reset, sign-out, deletions).
pub fn ok_empty() -> Response {
    (
        StatusCode::OK,
        Json(Envelope::<()> {
            status: 200,
            message: None,
            data: None,
        }),
    )
        .into_response()
}

pub fn bad_request(message: Vec<ErrorCode>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(Envelope::<()> {
            status: 400,
            message: Some(message),
            data: None,
        }),
    )
        .into_response()
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Envelope::<()> {
            status: 401,
            message: Some(vec![ErrorCode::Unauthorized]),
            data: None,
        }),
    )
        .into_response()
}

/// Persistence or downstream faults; never a domain code.
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Envelope::<()> {
            status: 500,
            message: Some(vec![ErrorCode::InternalError]),
            data: None,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn error_codes_serialize_kebab_case() -> Result<()> {
        let cases = [
            (ErrorCode::RequiredParam, "required-param"),
            (ErrorCode::ValidationUserId, "validation-user-id"),
            (ErrorCode::ValidationUserName, "validation-user-name"),
            (ErrorCode::ValidationEmail, "validation-email"),
            (ErrorCode::ValidationPassword, "validation-password"),
            (ErrorCode::ValidationGender, "validation-gender"),
            (ErrorCode::ValidationBirthday, "validation-birthday"),
            (ErrorCode::AlreadyUserId, "already-user-id"),
            (ErrorCode::AlreadyEmail, "already-email"),
            (ErrorCode::UnknownUser, "unknown-user"),
            (ErrorCode::MailSendFailure, "mail-send-failure"),
            (ErrorCode::InternalError, "internal-error"),
        ];

        for (code, expected) in cases {
            let value = serde_json::to_value(code)?;
            assert_eq!(value, serde_json::json!(expected));
        }
        Ok(())
    }

    #[test]
    fn success_envelope_has_null_message() -> Result<()> {
        let envelope = Envelope {
            status: 200,
            message: None,
            data: Some(TokenData {
                token: "abc".to_string(),
            }),
        };
        let value = serde_json::to_value(&envelope)?;
        assert_eq!(value.get("status"), Some(&serde_json::json!(200)));
        assert!(value.get("message").context("missing message")?.is_null());
        assert_eq!(
            value
                .get("data")
                .and_then(|data| data.get("token"))
                .and_then(serde_json::Value::as_str),
            Some("abc")
        );
        Ok(())
    }

    #[test]
    fn failure_envelope_preserves_code_order() -> Result<()> {
        let envelope = Envelope::<()> {
            status: 400,
            message: Some(vec![ErrorCode::AlreadyUserId, ErrorCode::AlreadyEmail]),
            data: None,
        };
        let value = serde_json::to_value(&envelope)?;
        assert_eq!(
            value.get("message"),
            Some(&serde_json::json!(["already-user-id", "already-email"]))
        );
        assert!(value.get("data").context("missing data")?.is_null());
        Ok(())
    }
}
