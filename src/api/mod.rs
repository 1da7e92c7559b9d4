//! HTTP API module: the `/api` routes, validation and response envelope.

pub mod docs;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod validation;

pub use handlers::AppState;
pub use response::{ApiError, ApiResponse, FieldError};
pub use routes::{apply_http_layers, create_router};
