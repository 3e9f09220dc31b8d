use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{info, warn};

use crate::{
    core::DEFAULT_ALTERNATIVE_COUNT,
    error::PlannerError,
    server::AppState,
    types::{Activity, DetailLevel, PlanStatus, TravelRequest},
};

type JsonBody = Result<Json<Value>, JsonRejection>;

fn error_response(status: StatusCode, error: &PlannerError) -> Response {
    let mut payload = error.to_error_payload();
    payload["status"] = json!(PlanStatus::Error);
    (status, Json(payload)).into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        &PlannerError::Validation(message.into()),
    )
}

/// The JSON object a POST carried, or a 400 response.
fn object_body(body: JsonBody) -> Result<Value, Response> {
    match body {
        Ok(Json(value @ Value::Object(_))) => Ok(value),
        Ok(Json(_)) => Err(bad_request("No data provided")),
        Err(rejection) => Err(bad_request(format!("malformed request body: {rejection}"))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, Response> {
    serde_json::from_value(value).map_err(|err| bad_request(format!("invalid request: {err}")))
}

#[derive(Debug, Deserialize)]
struct PlanBody {
    #[serde(flatten)]
    request: TravelRequest,
    #[serde(default)]
    detail_level: Option<DetailLevel>,
    #[serde(default)]
    debug_mode: bool,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "tripweaver",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_plan(State(state): State<AppState>, body: JsonBody) -> Response {
    let body: PlanBody = match object_body(body).and_then(decode) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let level = body.detail_level.unwrap_or_default();

    match state
        .orchestrator
        .generate_plan(body.request, level, body.debug_mode)
        .await
    {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(failure) => (StatusCode::BAD_REQUEST, Json(failure.to_payload())).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RefineBody {
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    refinements: Map<String, Value>,
    #[serde(default)]
    debug_mode: bool,
}

pub async fn refine_plan(State(state): State<AppState>, body: JsonBody) -> Response {
    let body: RefineBody = match object_body(body).and_then(decode) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(plan_id) = body.plan_id.filter(|id| !id.is_empty()) else {
        return bad_request("plan_id is required");
    };

    match state
        .orchestrator
        .refine_plan(&plan_id, &body.refinements, body.debug_mode)
        .await
    {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(failure) => (StatusCode::BAD_REQUEST, Json(failure.to_payload())).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AlternativesBody {
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    debug_mode: bool,
}

pub async fn alternatives(State(state): State<AppState>, body: JsonBody) -> Response {
    let body: AlternativesBody = match object_body(body).and_then(decode) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(plan_id) = body.plan_id.filter(|id| !id.is_empty()) else {
        return bad_request("plan_id is required");
    };
    let count = body.count.unwrap_or(DEFAULT_ALTERNATIVE_COUNT);

    match state
        .orchestrator
        .get_alternatives(&plan_id, count, body.debug_mode)
        .await {
        Ok(alternatives) => (StatusCode::OK, Json(alternatives)).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err),
    }
}

pub async fn get_plan(State(state): State<AppState>, Path(plan_id): Path<String>) -> Response {
    match state.orchestrator.get_plan(&plan_id).await {
        Some(plan) => (StatusCode::OK, Json(plan)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            &PlannerError::NotFound(format!("plan {plan_id}")),
        ),
    }
}

pub async fn get_trace(State(state): State<AppState>, Path(plan_id): Path<String>) -> Response {
    match state.orchestrator.get_trace(&plan_id).await {
        Some(trace) => (
            StatusCode::OK,
            Json(json!({"status": PlanStatus::Success, "trace": trace})),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            &PlannerError::NotFound(format!("debug trace for plan {plan_id}")),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct RegenerateDayBody {
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    day_number: Option<u32>,
    #[serde(default)]
    adjustments: Option<Value>,
}

pub async fn regenerate_day(State(state): State<AppState>, body: JsonBody) -> Response {
    let body: RegenerateDayBody = match object_body(body).and_then(decode) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let (Some(plan_id), Some(day_number)) = (
        body.plan_id.filter(|id| !id.is_empty()),
        body.day_number.filter(|day| *day > 0),
    ) else {
        return bad_request("plan_id and day_number are required");
    };

    match state
        .orchestrator
        .regenerate_day(&plan_id, day_number, body.adjustments.as_ref())
        .await
    {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err),
    }
}

#[derive(Debug, Deserialize)]
struct SingleActivityBody {
    #[serde(default)]
    activity: Option<Activity>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    day_number: Option<u32>,
}

pub async fn enrich_single_activity(State(state): State<AppState>, body: JsonBody) -> Response {
    let body: SingleActivityBody = match object_body(body).and_then(decode) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let Some(activity) = body.activity else {
        return bad_request("activity data required");
    };
    let destination = body.destination.unwrap_or_default();

    let enriched = state
        .orchestrator
        .enrich_single_activity(&activity, &destination, body.day_number.unwrap_or(1))
        .await;
    (
        StatusCode::OK,
        Json(json!({"status": PlanStatus::Success, "data": enriched})),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(default)]
    plan_id: String,
}

pub async fn enrich_progressive(
    State(state): State<AppState>,
    Query(query): Query<ProgressQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(plan_id = %query.plan_id, "progressive enrichment requested");
    let receiver = state.orchestrator.stream_enrichment(&query.plan_id).await;

    let stream = ReceiverStream::new(receiver).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|err| {
            warn!(error = %err, "failed to encode enrichment event");
            json!({"status": "error", "error": err.to_string()}).to_string()
        });
        Ok(Event::default().data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": PlanStatus::Error, "error": "Endpoint not found"})),
    )
        .into_response()
}
