use axum::response::{IntoResponse, Json};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner")
    ),
    tag = "health"
)]
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
