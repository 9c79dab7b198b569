//! Route handlers.
//!
//! Account flows (sign-up, sign-in, password reset) run as linear gate
//! machines: presence, then format, then existence/uniqueness, then the
//! side-effecting commit. Every check inside a gate runs before the gate
//! short-circuits, so one response carries every failing field.

pub mod children;
pub mod health;
pub mod password_reset;
pub mod root;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_strips_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn bearer_token_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }
}
