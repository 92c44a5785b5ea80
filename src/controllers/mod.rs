pub mod catalog;
pub mod wizard;

use axum::{http::StatusCode, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::WizardError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(catalog::routes())
        .merge(wizard::routes())
}

/// Полный роутер сервиса
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Repair Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/* ---------- helpers ---------- */

pub(crate) fn error_response(e: WizardError) -> (StatusCode, String) {
    let status = match &e {
        WizardError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WizardError::UnknownSelection(_) => StatusCode::BAD_REQUEST,
        WizardError::InvalidTransition { .. }
        | WizardError::ModelsLoading
        | WizardError::SubmissionInFlight => StatusCode::CONFLICT,
        WizardError::Fetch(_) | WizardError::Submission { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}
