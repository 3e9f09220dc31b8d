//! tripweaver: a staged, fallback-safe LLM pipeline for travel planning
//!
//! A request flows through constraint normalization, destination
//! recommendation, itinerary planning and per-day enrichment. Every
//! model-backed stage validates the model's JSON against a schema and falls
//! back to deterministic output when generation or validation fails, so a
//! run only errors on invalid input.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tripweaver::{Constraints, DetailLevel, Orchestrator, PlannerConfig, TravelRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PlannerConfig::from_env()?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let request = TravelRequest::new(Constraints {
//!         dates: Some("2024-07-01 to 2024-07-05".to_string()),
//!         budget: Some(2000.0),
//!         interests: vec!["food".to_string(), "history".to_string()],
//!         ..Constraints::default()
//!     });
//!
//!     let plan = orchestrator.generate_plan(request, DetailLevel::Full, false).await?;
//!     println!("{}", serde_json::to_string_pretty(&plan)?);
//!     Ok(())
//! }
//! ```

extern crate self as tripweaver;

pub mod config;
pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod stages;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "server")]
pub mod server;

pub use config::PlannerConfig;
pub use crate::core::{
    Alternatives, DayRegeneration, InMemoryPlanStore, InMemoryTraceStore, Orchestrator,
    PlanRepository, TraceRepository,
};
pub use error::{PlannerError, Result};
pub use schemas::{CompletionSchema, SchemaHandle};
pub use services::{GenerationRequest, OpenAiClient, SourceValidator, TextGenerator};
pub use tripweaver_macros::completion_schema;
pub use types::{
    Activity, Constraints, Destination, DetailLevel, EnrichmentEvent, ExecutionTrace,
    ItineraryDay, ParsedConstraints, Plan, PlanAction, PlanFailure, PlanResult, TravelRequest,
};

pub use schemas as schema;
