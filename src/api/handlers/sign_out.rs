use axum::{extract::Extension, http::HeaderMap, response::Response};
use tracing::{error, instrument};

use crate::api::{handlers::bearer_token, response, storage::TokenStore};

#[utoipa::path(
    post,
    path = "/v1/account/sign-out",
    responses(
        (status = 200, description = "Session token revoked"),
        (status = 401, description = "Missing or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "account"
)]
#[instrument(skip(headers, tokens))]
pub async fn sign_out(headers: HeaderMap, tokens: Extension<TokenStore>) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return response::unauthorized();
    };

    match tokens.revoke(&token).await {
        Ok(true) => response::ok_empty(),
        Ok(false) => response::unauthorized(),
        Err(e) => {
            error!("Error revoking token: {e:?}");
            response::internal_error()
        }
    }
}
