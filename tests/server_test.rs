#![cfg(feature = "server")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tripweaver::{
    server::router, services::generation::testing::ScriptedGenerator, stages::ActivityEnricher,
    Orchestrator,
};

fn app() -> Router {
    let generator = Arc::new(ScriptedGenerator::failing());
    let orchestrator = Orchestrator::new(generator)
        .with_activity_enricher(ActivityEnricher::new().with_page_fetch(false));
    router(orchestrator)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "tripweaver");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = app();

    let (status, body) = send(&app, post("/api/plan", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, post("/api/plan", "[1, 2]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post("/api/plan", r#"{"detail_level": "exhaustive"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_round_trip() {
    let app = app();
    let request = json!({
        "dates": "2024-07-01 to 2024-07-03",
        "budget": 900,
        "detail_level": "medium",
        "debug_mode": true
    });

    let (status, plan) = send(&app, post("/api/plan", request.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["status"], "success");
    assert_eq!(plan["level"], "medium");
    let plan_id = plan["plan_id"].as_str().unwrap().to_string();

    let (status, stored) = send(&app, get(&format!("/api/plan/{plan_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["plan_id"], plan_id.as_str());

    let (status, trace) = send(&app, get(&format!("/api/debug/{plan_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trace["trace"]["plan_id"], plan_id.as_str());
}

#[tokio::test]
async fn test_unknown_plan_is_not_found() {
    let app = app();

    let (status, body) = send(&app, get("/api/plan/deadbeef")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app, get("/api/debug/deadbeef")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Endpoint not found");
}

#[tokio::test]
async fn test_conflicting_constraints_are_bad_request() {
    let request = json!({
        "dates": "2024-07-01 to 2024-07-05",
        "budget": 100,
        "travel_style": "luxury"
    });

    let (status, body) = send(&app(), post("/api/plan", request.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["code"], "CONSTRAINT_CONFLICT");
    assert!(body["plan_id"].is_string());
}

#[tokio::test]
async fn test_refine_and_regenerate_need_ids() {
    let app = app();

    let (status, body) = send(&app, post("/api/refine", r#"{"refinements": {}}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("plan_id"));

    let (status, _) = send(&app, post("/api/regenerate-day", r#"{"plan_id": "abc"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post("/api/alternatives", r#"{"plan_id": "missing"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_activity_enrichment_falls_back() {
    let request = json!({
        "activity": {"name": "Tram 28", "duration": "1 hour", "type": "sightseeing", "priority": "high"},
        "destination": "Lisbon",
        "day_number": 2
    });

    let (status, body) = send(&app(), post("/api/enrich-single-activity", request.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["name"], "Tram 28");
    assert_eq!(body["data"]["fallback_mode"], true);
    assert_eq!(body["data"]["cost_estimate"], 20.0);
}
