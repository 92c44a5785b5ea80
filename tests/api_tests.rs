//! HTTP-level tests: the full router over the built-in catalog and a recording sink

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use repair_booking::{
    catalog::InMemoryCatalog, config::Config, controllers, services::submission::RecordingSink,
    AppState,
};

fn app_with_sink(sink: RecordingSink) -> Router {
    let state = AppState::with_parts(
        Config::from_env(),
        Arc::new(InMemoryCatalog::seeded()),
        Arc::new(sink),
    );
    controllers::app(Arc::new(state))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_wizard(app: &Router) -> String {
    let (status, body) = send_json(app, Method::POST, "/api/wizard", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let app = app_with_sink(RecordingSink::new());
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn catalog_lists_models_of_one_type() {
    let app = app_with_sink(RecordingSink::new());

    let (status, types) = send_json(&app, Method::GET, "/api/catalog/device-types", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(types.as_array().unwrap().len(), 8);

    let (status, models) =
        send_json(&app, Method::GET, "/api/catalog/device-types/2/models", None).await;
    assert_eq!(status, StatusCode::OK);
    let models = models.as_array().unwrap();
    assert!(!models.is_empty());
    assert!(models.iter().all(|m| m["device_type_id"] == 2));

    let (status, _) = send(&app, Method::GET, "/api/catalog/device-types/999/models", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quote_endpoint_applies_multipliers() {
    let app = app_with_sink(RecordingSink::new());

    // 250 * 1.2 * 1.5
    let (status, quote) = send_json(
        &app,
        Method::GET,
        "/api/quote?category=laptop&brand=Apple&service_type_id=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["final_price"], 450);
    assert_eq!(quote["source"], "formula");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/quote?category=phone&brand=Apple&service_type_id=99",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn complete_booking_over_http() {
    let sink = RecordingSink::new();
    let app = app_with_sink(sink.clone());
    let id = create_wizard(&app).await;
    let base = format!("/api/wizard/{}", id);

    let (status, view) = send_json(
        &app,
        Method::POST,
        &format!("{}/device-type", base),
        Some(json!({ "device_type_id": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["device_models"]["state"], "loaded");

    let steps = [
        (Method::POST, "advance", None),
        (Method::POST, "device-model", Some(json!({ "device_model_id": 101 }))),
        (Method::POST, "advance", None),
        (Method::POST, "service-type", Some(json!({ "service_type_id": 2 }))),
        (Method::POST, "advance", None),
        (Method::PUT, "description", Some(json!({ "description": "Battery drains in an hour" }))),
        (Method::POST, "advance", None),
        (
            Method::PUT,
            "contact",
            Some(json!({
                "name": "Noura Al-Harbi",
                "phone": "+966 50 123 4567",
                "address": "King Fahd Road 12",
                "city": "Riyadh"
            })),
        ),
    ];
    for (method, action, body) in steps {
        let (status, _) = send(&app, method, &format!("{}/{}", base, action), body).await;
        assert_eq!(status, StatusCode::OK, "{} failed", action);
    }

    let (_, view) = send_json(&app, Method::GET, &base, None).await;
    assert_eq!(view["step"], "contact_and_summary");
    assert_eq!(view["quote"]["final_price"], 450);

    let (status, body) = send_json(&app, Method::POST, &format!("{}/submit", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"], "RB-000001");
    assert_eq!(body["wizard"]["step"], "submitted");

    let submitted = sink.submissions();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].device_model_id, 101);
    assert_eq!(submitted[0].contact.city, "Riyadh");
}

#[tokio::test]
async fn advancing_without_selection_is_unprocessable() {
    let app = app_with_sink(RecordingSink::new());
    let id = create_wizard(&app).await;

    let (status, body) = send(&app, Method::POST, &format!("/api/wizard/{}/advance", id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8_lossy(&body).contains("device_type_id"));
}

#[tokio::test]
async fn unknown_device_type_is_bad_request() {
    let app = app_with_sink(RecordingSink::new());
    let id = create_wizard(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/wizard/{}/device-type", id),
        Some(json!({ "device_type_id": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discarded_session_is_gone() {
    let app = app_with_sink(RecordingSink::new());
    let id = create_wizard(&app).await;
    let uri = format!("/api/wizard/{}", id);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wizard_can_start_in_arabic() {
    let app = app_with_sink(RecordingSink::new());
    let (status, body) = send_json(&app, Method::POST, "/api/wizard?language=ar", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wizard"]["language"], "ar");
}

#[tokio::test]
async fn missing_phone_is_fixed_with_patch() {
    let sink = RecordingSink::new();
    let app = app_with_sink(sink.clone());
    let id = create_wizard(&app).await;
    let base = format!("/api/wizard/{}", id);

    let steps = [
        (Method::POST, "device-type", Some(json!({ "device_type_id": 7 }))),
        (Method::POST, "advance", None),
        (Method::POST, "device-model", Some(json!({ "device_model_id": 701 }))),
        (Method::POST, "advance", None),
        (Method::POST, "service-type", Some(json!({ "service_type_id": 6 }))),
        (Method::POST, "advance", None),
        (Method::PUT, "description", Some(json!({ "description": "Stuck on boot logo" }))),
        (Method::POST, "advance", None),
        (
            Method::PUT,
            "contact",
            Some(json!({ "name": "Omar", "phone": "", "address": "Tahlia St 4", "city": "Jeddah" })),
        ),
    ];
    for (method, action, body) in steps {
        let (status, _) = send(&app, method, &format!("{}/{}", base, action), body).await;
        assert_eq!(status, StatusCode::OK, "{} failed", action);
    }

    let (status, body) = send(&app, Method::POST, &format!("{}/submit", base), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8_lossy(&body).contains("phone"));
    assert_eq!(sink.count(), 0);

    let (status, view) = send_json(
        &app,
        Method::PATCH,
        &format!("{}/contact", base),
        Some(json!({ "phone": "+966 55 765 4321" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["draft"]["contact"]["name"], "Omar");

    let (status, _) = send(&app, Method::POST, &format!("{}/submit", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sink.count(), 1);
}
