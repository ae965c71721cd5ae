pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use handlers::ApiDoc;

use crate::{ingest::IngestService, liveness::LivenessRegistry, status::StatusService};

/// Services shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub status: StatusService,
    pub registry: LivenessRegistry,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/data", post(handlers::post_data))
        .route("/sensors/status", get(handlers::get_status))
        .route("/sensors/liveness", get(handlers::get_liveness))
        .route("/sensors/liveness/{key}", get(handlers::get_liveness_key))
        .route("/alerts", get(handlers::get_alerts))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
