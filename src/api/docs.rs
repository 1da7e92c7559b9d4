//! OpenAPI description of the `/api` routes.

use axum::Json;
use utoipa::OpenApi;

use crate::model::{CampaignRecord, Dedication, DedicationStatus};

use super::handlers::{self, HealthResponse};
use super::response::FieldError;

/// OpenAPI document for the campaign API.
#[derive(OpenApi)]
#[openapi(
    info(title = "Campaign API", description = "Campaign progress and dedication management"),
    paths(
        handlers::health,
        handlers::get_campaign,
        handlers::update_campaign,
        handlers::list_dedications,
        handlers::update_dedication,
        handlers::add_dedication,
    ),
    components(schemas(CampaignRecord, Dedication, DedicationStatus, FieldError, HealthResponse)),
    tags(
        (name = "campaign", description = "Campaign funding progress"),
        (name = "dedications", description = "Named giving opportunities"),
        (name = "system", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
