use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::error_response;
use crate::models::{CatalogId, ContactInfo, ContactPatch, Language};
use crate::wizard::{BookingSession, WizardConfig};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wizard", post(create_wizard))
        .route("/wizard/{id}", get(get_wizard).delete(discard_wizard))
        .route("/wizard/{id}/device-type", post(select_device_type))
        .route("/wizard/{id}/device-model", post(select_device_model))
        .route("/wizard/{id}/service-type", post(select_service_type))
        .route("/wizard/{id}/description", put(set_description))
        .route("/wizard/{id}/contact", put(set_contact).patch(patch_contact))
        .route("/wizard/{id}/advance", post(advance))
        .route("/wizard/{id}/retreat", post(retreat))
        .route("/wizard/{id}/submit", post(submit))
}

/* ---------- helpers ---------- */

async fn find_session(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<BookingSession>, (StatusCode, String)> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("booking session {} not found", id)))
}

/* ---------- SESSION ---------- */

// POST /api/wizard?language=ar
#[derive(Debug, Deserialize)]
struct CreateWizardQuery {
    language: Option<Language>,
}

async fn create_wizard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CreateWizardQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let config = WizardConfig {
        language: params.language.unwrap_or(state.config.app.language),
    };
    let session = state.open_session(config).await.map_err(|e| {
        tracing::error!("create_wizard failed to load catalog: {:?}", e);
        error_response(e)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": session.id(), "wizard": session.view().await })),
    ))
}

// GET /api/wizard/{id}
async fn get_wizard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    Ok(Json(session.view().await))
}

// DELETE /api/wizard/{id}
async fn discard_wizard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("booking session {} not found", id)))
    }
}

/* ---------- SELECTIONS ---------- */

#[derive(Debug, Deserialize)]
struct SelectDeviceTypeRequest {
    device_type_id: CatalogId,
}

// POST /api/wizard/{id}/device-type
async fn select_device_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectDeviceTypeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session
        .select_device_type(req.device_type_id)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct SelectDeviceModelRequest {
    device_model_id: CatalogId,
}

// POST /api/wizard/{id}/device-model
async fn select_device_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectDeviceModelRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session
        .select_device_model(req.device_model_id)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct SelectServiceTypeRequest {
    service_type_id: CatalogId,
}

// POST /api/wizard/{id}/service-type
async fn select_service_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectServiceTypeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session
        .select_service_type(req.service_type_id)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct DescriptionRequest {
    description: String,
}

// PUT /api/wizard/{id}/description
async fn set_description(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<DescriptionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session
        .set_description(req.description)
        .await
        .map_err(error_response)?;
    Ok(Json(view))
}

// PUT /api/wizard/{id}/contact
async fn set_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(contact): Json<ContactInfo>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session.set_contact(contact).await.map_err(error_response)?;
    Ok(Json(view))
}

// PATCH /api/wizard/{id}/contact
async fn patch_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ContactPatch>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session.patch_contact(patch).await.map_err(error_response)?;
    Ok(Json(view))
}

/* ---------- NAVIGATION ---------- */

// POST /api/wizard/{id}/advance
async fn advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session.advance().await.map_err(error_response)?;
    Ok(Json(view))
}

// POST /api/wizard/{id}/retreat
async fn retreat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let view = session.retreat().await.map_err(error_response)?;
    Ok(Json(view))
}

// POST /api/wizard/{id}/submit
async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = find_session(&state, id).await?;
    let reference = session.submit().await.map_err(|e| {
        tracing::warn!("submit for session {} failed: {}", id, e);
        error_response(e)
    })?;

    Ok(Json(json!({
        "reference": reference,
        "wizard": session.view().await
    })))
}
