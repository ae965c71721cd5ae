use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use utoipa::OpenApi;

use super::{
    dto::{ErrorResponse, IngestResponse, SensorLivenessDto},
    errors::AppError,
    AppState,
};
use crate::{
    db::models::SensorKind,
    ingest::payload::RawReading,
    status::{AlertEntry, SensorStatus, SideStatus},
    thresholds::{evaluator::SafetyStatus, Severity},
};

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Ingest one reading object or an array of them.
///
/// The whole submission is validated first; then every kind is written in one
/// transaction. If any kind fails to persist, nothing from the submission is kept.
#[utoipa::path(
    post,
    path = "/data",
    request_body(
        content = Vec<RawReading>,
        description = "A single reading object or an array of reading objects",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "All readings persisted", body = IngestResponse),
        (status = 400, description = "Malformed or invalid submission", body = ErrorResponse),
        (status = 500, description = "Persisting failed; nothing was saved", body = ErrorResponse),
    ),
    tag = "ingest"
)]
pub async fn post_data(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let report = state.ingest.ingest(&body).await?;
    Ok(Json(IngestResponse::processed(report.items)))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Latest temperature and humidity per configured `(area, sensor_no)`.
#[utoipa::path(
    get,
    path = "/sensors/status",
    responses(
        (status = 200, description = "Current sensor status", body = Vec<SensorStatus>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn get_status(State(state): State<AppState>) -> Result<Json<Vec<SensorStatus>>, AppError> {
    Ok(Json(state.status.current_status(Utc::now()).await?))
}

/// Sensors whose latest reading today breaches a threshold.
#[utoipa::path(
    get,
    path = "/alerts",
    responses(
        (status = 200, description = "Today's alerting readings", body = Vec<AlertEntry>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "sensors"
)]
pub async fn get_alerts(State(state): State<AppState>) -> Result<Json<Vec<AlertEntry>>, AppError> {
    Ok(Json(state.status.todays_alerts(Utc::now()).await?))
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Liveness of every sensor seen since startup, sorted by key.
#[utoipa::path(
    get,
    path = "/sensors/liveness",
    responses(
        (status = 200, description = "Liveness snapshots", body = Vec<SensorLivenessDto>),
    ),
    tag = "liveness"
)]
pub async fn get_liveness(State(state): State<AppState>) -> Json<Vec<SensorLivenessDto>> {
    let all = state.registry.snapshot_all().await;
    Json(all.into_iter().map(Into::into).collect())
}

/// Liveness of one sensor. `null` when the key has never reported.
#[utoipa::path(
    get,
    path = "/sensors/liveness/{key}",
    params(
        ("key" = String, Path, description = "Sensor key, e.g. `temperature-1-1` or `prox-7`"),
    ),
    responses(
        (status = 200, description = "Liveness snapshot or null", body = SensorLivenessDto),
    ),
    tag = "liveness"
)]
pub async fn get_liveness_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<Option<SensorLivenessDto>> {
    Json(state.registry.snapshot(&key).await.map(Into::into))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI document
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(post_data, get_status, get_alerts, get_liveness, get_liveness_key, health),
    components(schemas(
        RawReading,
        IngestResponse,
        ErrorResponse,
        SensorStatus,
        SideStatus,
        AlertEntry,
        SafetyStatus,
        SensorLivenessDto,
        SensorKind,
        Severity,
    )),
    tags(
        (name = "ingest",   description = "Sensor data ingestion"),
        (name = "sensors",  description = "Current status and alerts"),
        (name = "liveness", description = "Offline detection state"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Sensor Watch API",
        version = "0.1.0",
        description = "Ingestion, threshold alerting and offline detection for environmental sensors"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
