//! HTTP API handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::metrics;
use crate::model::{CampaignRecord, Dedication};
use crate::storage::StorageAdapter;

use super::response::{ApiError, ApiResponse};
use super::validation::{
    parse_id, validate_campaign, validate_dedication, CampaignPayload, DedicationPayload, IdField,
};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Data-access layer.
    pub storage: StorageAdapter,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state without metrics export.
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always true.
    pub success: bool,
    /// "Server is running".
    pub message: String,
    /// Current server time, RFC 3339.
    pub timestamp: String,
    /// Active storage backend.
    pub storage: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses((status = 200, description = "Server is running", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(HealthResponse {
        success: true,
        message: "Server is running".to_string(),
        timestamp,
        storage: state.storage.backend_name().to_string(),
    })
}

/// Return the campaign record.
#[utoipa::path(
    get,
    path = "/api/campaign-data",
    tag = "campaign",
    responses(
        (status = 200, description = "Current campaign record", body = CampaignRecord),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn get_campaign(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CampaignRecord>>, ApiError> {
    let campaign = state
        .storage
        .get_campaign()
        .await
        .map_err(ApiError::storage("Error retrieving campaign data"))?;

    Ok(Json(ApiResponse::ok(campaign)))
}

/// Replace the campaign record.
#[utoipa::path(
    post,
    path = "/api/update-campaign",
    tag = "campaign",
    request_body = CampaignRecord,
    responses(
        (status = 200, description = "Campaign replaced", body = CampaignRecord),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn update_campaign(
    State(state): State<AppState>,
    payload: Result<Json<CampaignPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<CampaignRecord>>, ApiError> {
    let payload = body(payload)?;
    let record = validate_campaign(&payload).map_err(|errors| {
        metrics::inc_validation_failures("update-campaign");
        ApiError::Validation(errors)
    })?;

    let stored = state
        .storage
        .set_campaign(record)
        .await
        .map_err(ApiError::storage("Error updating campaign. Please try again."))?;

    metrics::inc_campaign_updates();
    info!(goal = %stored.goal, raised = %stored.raised, "Campaign updated");
    Ok(Json(ApiResponse::ok_with_message(
        "Campaign updated successfully",
        stored,
    )))
}

/// Return every dedication.
#[utoipa::path(
    get,
    path = "/api/dedications",
    tag = "dedications",
    responses(
        (status = 200, description = "Full dedication list", body = [Dedication]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list_dedications(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Dedication>>>, ApiError> {
    let dedications = state
        .storage
        .list_dedications()
        .await
        .map_err(ApiError::storage("Error retrieving dedications"))?;

    Ok(Json(ApiResponse::ok(dedications)))
}

/// Replace an existing dedication by id.
#[utoipa::path(
    post,
    path = "/api/update-dedication",
    tag = "dedications",
    request_body = Dedication,
    responses(
        (status = 200, description = "Dedication replaced", body = Dedication),
        (status = 400, description = "Validation failed or id missing"),
        (status = 404, description = "Dedication not found"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn update_dedication(
    State(state): State<AppState>,
    payload: Result<Json<DedicationPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<Dedication>>, ApiError> {
    let payload = body(payload)?;
    let fields = validate_dedication(&payload).map_err(|errors| {
        metrics::inc_validation_failures("update-dedication");
        ApiError::Validation(errors)
    })?;

    let id = match parse_id(payload.id.as_ref()) {
        IdField::Missing => return Err(ApiError::MissingId),
        IdField::Unmatchable => return Err(ApiError::DedicationNotFound),
        IdField::Id(id) => id,
    };

    let stored = state
        .storage
        .replace_dedication(id, fields)
        .await
        .map_err(ApiError::storage("Error updating dedication. Please try again."))?
        .ok_or(ApiError::DedicationNotFound)?;

    metrics::inc_dedications_updated();
    info!(id = stored.id, status = %stored.status, "Dedication updated");
    Ok(Json(ApiResponse::ok_with_message(
        "Dedication updated successfully",
        stored,
    )))
}

/// Append a new dedication.
#[utoipa::path(
    post,
    path = "/api/add-dedication",
    tag = "dedications",
    request_body = Dedication,
    responses(
        (status = 201, description = "Dedication created", body = Dedication),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn add_dedication(
    State(state): State<AppState>,
    payload: Result<Json<DedicationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Dedication>>), ApiError> {
    let payload = body(payload)?;
    let fields = validate_dedication(&payload).map_err(|errors| {
        metrics::inc_validation_failures("add-dedication");
        ApiError::Validation(errors)
    })?;

    let added = state
        .storage
        .add_dedication(fields.into_new())
        .await
        .map_err(ApiError::storage("Error adding dedication. Please try again."))?;

    metrics::inc_dedications_added();
    info!(id = added.id, title = %added.title, "Dedication added");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            "Dedication added successfully",
            added,
        )),
    ))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Prometheus text exposition.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => {
            debug!("Metrics requested but no recorder is installed");
            ApiError::RouteNotFound.into_response()
        }
    }
}
