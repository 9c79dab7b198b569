//! HTTP surface: router construction, shared layers, and server startup.

use crate::{
    api::handlers::{children, health, password_reset, root, sign_in, sign_out, sign_up},
    cli::globals::GlobalArgs,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{delete, get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod email;
pub mod handlers;
pub mod openapi;
pub mod response;
pub mod storage;
pub mod validation;

use email::Mailer;
use storage::{AccountStore, ChildStore, TokenStore};

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let mailer = Mailer::from_globals(globals)?;

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(Any);

    let app = Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .route("/v1/account/sign-up", post(sign_up::sign_up))
        .route("/v1/account/sign-in", post(sign_in::sign_in))
        .route(
            "/v1/account/password-reset",
            post(password_reset::password_reset),
        )
        .route("/v1/account/sign-out", post(sign_out::sign_out))
        .route(
            "/v1/children",
            get(children::list_children).post(children::add_child),
        )
        .route("/v1/children/:child_id", delete(children::delete_child))
        .route(
            "/v1/children/:child_id/vaccinations",
            post(children::add_vaccination),
        )
        .route(
            "/v1/children/:child_id/vaccinations/:vaccination_id",
            delete(children::delete_vaccination),
        )
        .route(
            "/v1/children/:child_id/allergies",
            post(children::add_allergy),
        )
        .route(
            "/v1/children/:child_id/allergies/:allergy_id",
            delete(children::delete_allergy),
        )
        .route("/v1/children/:child_id/growth", post(children::add_growth))
        .merge(openapi::swagger())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(AccountStore::new(pool.clone())))
                .layer(Extension(TokenStore::new(pool.clone())))
                .layer(Extension(ChildStore::new(pool.clone())))
                .layer(Extension(mailer)),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
