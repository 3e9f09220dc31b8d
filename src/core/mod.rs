pub mod orchestrator;
pub mod store;
pub mod streaming;

pub use orchestrator::{
    new_plan_id, Alternatives, DayRegeneration, Orchestrator, DEFAULT_ALTERNATIVE_COUNT,
};
pub use store::{InMemoryPlanStore, InMemoryTraceStore, PlanRepository, TraceRepository};
pub use streaming::{enrich_progressively, STREAM_BUFFER};
