//! HTTP surface over the [`Orchestrator`](crate::core::Orchestrator).

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    core::Orchestrator,
    error::{PlannerError, Result},
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// All routes under `/api`, with CORS, request tracing and panic recovery.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/plan", post(handlers::create_plan))
        .route("/plan/:plan_id", get(handlers::get_plan))
        .route("/refine", post(handlers::refine_plan))
        .route("/alternatives", post(handlers::alternatives))
        .route("/debug/:plan_id", get(handlers::get_trace))
        .route("/regenerate-day", post(handlers::regenerate_day))
        .route("/enrich-single-activity", post(handlers::enrich_single_activity))
        .route("/enrich-progressive", get(handlers::enrich_progressive));

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(orchestrator: Orchestrator, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| PlannerError::Config(format!("cannot listen on {addr}: {err}")))?;
    info!("tripweaver listening on http://{addr}/api");

    axum::serve(listener, router(orchestrator))
        .await
        .map_err(|err| PlannerError::Unknown(format!("server stopped: {err}")))
}
