//! HTTP API route definitions.

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use super::docs::openapi_json;
use super::handlers::{self, AppState};
use super::response::ApiError;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    // Wrong-method requests fall through to the JSON 404 like unknown paths.
    let api = Router::new()
        .route(
            "/campaign-data",
            get(handlers::get_campaign).fallback(handlers::not_found),
        )
        .route(
            "/update-campaign",
            post(handlers::update_campaign).fallback(handlers::not_found),
        )
        .route(
            "/dedications",
            get(handlers::list_dedications).fallback(handlers::not_found),
        )
        .route(
            "/update-dedication",
            post(handlers::update_dedication).fallback(handlers::not_found),
        )
        .route(
            "/add-dedication",
            post(handlers::add_dedication).fallback(handlers::not_found),
        )
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route(
            "/openapi.json",
            get(openapi_json).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found);

    Router::new()
        .nest("/api", api)
        .route(
            "/metrics",
            get(handlers::prometheus_metrics).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Add CORS and request tracing around a router.
pub fn apply_http_layers(router: Router, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let router = if origins.is_empty() {
        router
    } else {
        let cors = CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true);
        router.layer(cors)
    };

    router.layer(TraceLayer::new_for_http())
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(%detail, "Unhandled error");
    ApiError::Internal.into_response()
}
