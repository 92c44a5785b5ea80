use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::FetchError;
use crate::models::{CatalogId, DeviceCategory};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog/device-types", get(get_device_types))
        .route("/catalog/device-types/{id}/models", get(get_device_models))
        .route("/catalog/service-types", get(get_service_types))
        .route("/quote", get(get_quote))
}

fn fetch_error(e: FetchError) -> (StatusCode, String) {
    tracing::error!("catalog error: {:?}", e);
    match e {
        FetchError::UnknownDeviceType(_) => (StatusCode::NOT_FOUND, e.to_string()),
        _ => (StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

// GET /api/catalog/device-types
async fn get_device_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let types = state.catalog.get_device_types().await.map_err(fetch_error)?;
    Ok(Json(types))
}

// GET /api/catalog/device-types/{id}/models
async fn get_device_models(
    State(state): State<Arc<AppState>>,
    Path(device_type_id): Path<CatalogId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if device_type_id <= 0 {
        return Err((StatusCode::BAD_REQUEST, "device type id must be > 0".to_string()));
    }
    let models = state
        .catalog
        .get_device_models(device_type_id)
        .await
        .map_err(fetch_error)?;
    Ok(Json(models))
}

// GET /api/catalog/service-types
async fn get_service_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let services = state.catalog.get_service_types().await.map_err(fetch_error)?;
    Ok(Json(services))
}

#[derive(Debug, Deserialize)]
struct QuoteQuery {
    category: DeviceCategory,
    brand: String,
    service_type_id: CatalogId,
}

// GET /api/quote - быстрая оценка по формуле, без модели устройства
async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuoteQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let services = state.catalog.get_service_types().await.map_err(fetch_error)?;
    let service = services
        .iter()
        .find(|s| s.id == params.service_type_id)
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("service type {} does not exist", params.service_type_id),
            )
        })?;

    let quote = state
        .pricing
        .estimate(params.category, &params.brand, service.base_price);
    Ok(Json(quote))
}
