use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::PlannerConfig,
    core::{
        store::{InMemoryPlanStore, InMemoryTraceStore, PlanRepository, TraceRepository},
        streaming::{enrich_progressively, STREAM_BUFFER},
    },
    error::{PlannerError, Result},
    services::{HttpLinkProbe, OpenAiClient, SourceValidator, TextGenerator},
    stages::{
        execute, normalize, ActivityEnricher, DestinationRecommender, DetailEnricher,
        EnhancementInput, ItineraryPlanner, PlanEnhancer, PlanningInput, RecommendationInput,
    },
    types::{
        Activity, Destination, DestinationBatch, DetailLevel, EnrichedActivity, EnrichmentEvent,
        ExecutionTrace, ParsedConstraints, Plan, PlanFailure, PlanResult, PlanStatus,
        TravelRequest,
    },
};

/// Candidates the recommender is asked for on a high-level run.
const HIGH_LEVEL_CANDIDATES: usize = 5;
pub const DEFAULT_ALTERNATIVE_COUNT: usize = 3;

/// Replacement destinations for a stored plan.
#[derive(Debug, Clone, Serialize)]
pub struct Alternatives {
    pub status: PlanStatus,
    pub plan_id: String,
    pub alternatives: Vec<Destination>,
    pub current_destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_trace: Option<ExecutionTrace>,
}

/// Acknowledgment of a day regeneration request.
#[derive(Debug, Clone, Serialize)]
pub struct DayRegeneration {
    pub status: PlanStatus,
    pub plan_id: String,
    pub day_number: u32,
    pub message: String,
}

/// Opaque short id: the first eight hex digits of a v4 UUID.
pub fn new_plan_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Sequences the stages into plans and keeps what they produce.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    plans: Arc<dyn PlanRepository>,
    traces: Arc<dyn TraceRepository>,
    validator: SourceValidator,
    recommender: DestinationRecommender,
    planner: ItineraryPlanner,
    enricher: DetailEnricher,
    activity_enricher: ActivityEnricher,
    enhancer: PlanEnhancer,
}

impl Orchestrator {
    /// In-memory stores and live link probing.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            plans: Arc::new(InMemoryPlanStore::new()),
            traces: Arc::new(InMemoryTraceStore::new()),
            validator: SourceValidator::new(Arc::new(HttpLinkProbe::new())),
            recommender: DestinationRecommender,
            planner: ItineraryPlanner,
            enricher: DetailEnricher::new(),
            activity_enricher: ActivityEnricher::new(),
            enhancer: PlanEnhancer::new(),
        }
    }

    /// Live OpenAI-compatible client built from `config`.
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        let client = OpenAiClient::from_config(config)?;
        Ok(Self::new(Arc::new(client)).with_enhancer(PlanEnhancer::from_config(config)))
    }

    pub fn with_plan_store(mut self, plans: Arc<dyn PlanRepository>) -> Self {
        self.plans = plans;
        self
    }

    pub fn with_trace_store(mut self, traces: Arc<dyn TraceRepository>) -> Self {
        self.traces = traces;
        self
    }

    pub fn with_validator(mut self, validator: SourceValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_enhancer(mut self, enhancer: PlanEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn with_activity_enricher(mut self, activity_enricher: ActivityEnricher) -> Self {
        self.activity_enricher = activity_enricher;
        self
    }

    /// Run the pipeline to `level` and store the result.
    ///
    /// A request carrying its own plan text and destination takes the
    /// enhancement path instead.
    pub async fn generate_plan(
        &self,
        request: TravelRequest,
        level: DetailLevel,
        debug_mode: bool,
    ) -> PlanResult {
        let plan_id = new_plan_id();
        if request.is_enhancement() {
            return self.enhance_with_id(plan_id, request, debug_mode).await;
        }

        let started = Instant::now();
        let mut trace = ExecutionTrace::new(
            plan_id.clone(),
            serde_json::to_value(&request).unwrap_or(Value::Null),
            level.as_str(),
        );
        info!(plan_id = %plan_id, level = level.as_str(), "generating plan");

        let outcome = self
            .run_pipeline(&plan_id, request, level, &mut trace)
            .await;
        self.finish_run(plan_id, outcome, trace, started, debug_mode)
            .await
    }

    /// Build a plan from the caller's own plan text.
    pub async fn enhance_existing_plan(
        &self,
        request: TravelRequest,
        debug_mode: bool,
    ) -> PlanResult {
        self.enhance_with_id(new_plan_id(), request, debug_mode).await
    }

    async fn enhance_with_id(
        &self,
        plan_id: String,
        request: TravelRequest,
        debug_mode: bool,
    ) -> PlanResult {
        let started = Instant::now();
        let mut trace = ExecutionTrace::new(
            plan_id.clone(),
            serde_json::to_value(&request).unwrap_or(Value::Null),
            DetailLevel::Enhanced.as_str(),
        );
        info!(plan_id = %plan_id, "enhancing caller plan");

        let outcome = self.run_enhancement(&plan_id, request, &mut trace).await;
        self.finish_run(plan_id, outcome, trace, started, debug_mode)
            .await
    }

    async fn finish_run(
        &self,
        plan_id: String,
        outcome: Result<Plan>,
        mut trace: ExecutionTrace,
        started: Instant,
        debug_mode: bool,
    ) -> PlanResult {
        match outcome {
            Ok(mut plan) => {
                plan.processing_time = started.elapsed().as_secs_f64();
                if debug_mode {
                    self.traces.put(trace.clone()).await;
                    plan.debug_trace = Some(trace);
                }
                info!(
                    plan_id = %plan_id,
                    level = plan.level.as_str(),
                    fallback = plan.fallback_mode,
                    seconds = plan.processing_time,
                    "plan ready"
                );
                self.plans.put(plan.clone()).await;
                Ok(plan)
            }
            Err(err) => {
                if matches!(err, PlannerError::Conflict(_)) {
                    warn!(plan_id = %plan_id, error = %err, "plan rejected");
                } else {
                    error!(plan_id = %plan_id, error = %err, "plan failed");
                }
                trace.error = Some(err.to_string());
                let mut failure = PlanFailure::new(plan_id, err);
                if debug_mode {
                    self.traces.put(trace.clone()).await;
                    failure.debug_trace = Some(trace);
                }
                Err(failure)
            }
        }
    }

    fn parse_constraints(
        &self,
        request: &TravelRequest,
        trace: &mut ExecutionTrace,
    ) -> Result<ParsedConstraints> {
        let timer = ExecutionTrace::start("constraint_parsing");
        let parsed = normalize(&request.constraints);
        trace.record(timer.output(serde_json::to_value(&parsed)?));

        if parsed.has_conflicts() {
            return Err(PlannerError::Conflict(parsed.conflicts.clone()));
        }
        Ok(parsed)
    }

    async fn run_pipeline(
        &self,
        plan_id: &str,
        request: TravelRequest,
        level: DetailLevel,
        trace: &mut ExecutionTrace,
    ) -> Result<Plan> {
        if level == DetailLevel::Enhanced {
            return Err(PlannerError::Validation(
                "the enhanced level needs existing_plan and specific_destination".to_string(),
            ));
        }

        let parsed = self.parse_constraints(&request, trace)?;
        let generator = self.generator.as_ref();

        let timer = ExecutionTrace::start("destination_recommendation");
        let batch = match request.destination() {
            Some(selection) => DestinationBatch {
                destinations: vec![Destination::user_selected(
                    selection,
                    parsed.daily_budget,
                    format!("Selected by user: {selection}"),
                )],
                reasoning_summary: "Using user-selected destination".to_string(),
                ..DestinationBatch::default()
            },
            None => {
                let count = if level == DetailLevel::HighLevel {
                    HIGH_LEVEL_CANDIDATES
                } else {
                    1
                };
                let input = RecommendationInput::new(parsed.clone(), count);
                execute(&self.recommender, generator, &input).await
            }
        };
        trace.record(timer.output(serde_json::to_value(&batch)?));

        let mut plan = Plan::new(plan_id, level, request, parsed.clone());
        plan.note_fallback("destination_recommendation", &batch.fallback);

        if level == DetailLevel::HighLevel {
            plan.destinations = batch.destinations;
            plan.reasoning = Some(batch.reasoning_summary);
            return Ok(plan);
        }

        let mut destinations = batch.destinations.into_iter();
        let top = destinations
            .next()
            .ok_or_else(|| PlannerError::Unknown("no destination to plan for".to_string()))?;
        plan.alternative_destinations = destinations.collect();

        let timer = ExecutionTrace::start("itinerary_planning");
        let input = PlanningInput::new(top.clone(), parsed.clone());
        let draft = execute(&self.planner, generator, &input).await;
        trace.record(timer.output(serde_json::to_value(&draft)?));
        plan.note_fallback("itinerary_planning", &draft.fallback);
        plan.warnings.extend(draft.warnings.iter().cloned());

        if level == DetailLevel::Medium {
            plan.destination = Some(top);
            plan.itinerary = draft.itinerary;
            plan.overview = Some(draft.overview);
            plan.pacing_notes = Some(draft.pacing_notes);
            return Ok(plan);
        }

        let timer = ExecutionTrace::start("detail_enrichment");
        let enriched = self
            .enricher
            .enrich(generator, &draft, &top.name, &parsed)
            .await;
        trace.record(timer.output(json!({
            "enrichment_level": enriched.enrichment_level,
            "fallback_days": enriched.fallback_days(),
        })));
        if !enriched.errors.is_empty() {
            plan.fallback_mode = true;
            plan.errors.extend(
                enriched
                    .errors
                    .iter()
                    .map(|error| format!("detail_enrichment: {error}")),
            );
        }

        plan.destination = Some(top);
        plan.itinerary = enriched.itinerary;
        plan.overview = Some(enriched.overview);
        plan.pacing_notes = Some(enriched.pacing_notes);
        plan.enrichment_level = Some(enriched.enrichment_level);
        Ok(plan)
    }

    async fn run_enhancement(
        &self,
        plan_id: &str,
        request: TravelRequest,
        trace: &mut ExecutionTrace,
    ) -> Result<Plan> {
        let parsed = self.parse_constraints(&request, trace)?;

        let selection = request
            .destination()
            .ok_or_else(|| {
                PlannerError::Validation("specific_destination is required".to_string())
            })?
            .to_string();
        let existing_plan = request.existing_plan.clone().unwrap_or_default();
        let action = request.plan_action.unwrap_or_default();

        let timer = ExecutionTrace::start("plan_enhancement");
        let input = EnhancementInput::new(existing_plan, selection.clone(), parsed.clone(), action);
        let enhanced = match self.enhancer.enhance(self.generator.clone(), input).await {
            Ok(enhanced) => enhanced,
            Err(err) => {
                trace.record(timer.error(&err));
                return Err(err);
            }
        };
        trace.record(timer.output(json!({
            "action": action,
            "fallback_mode": enhanced.fallback.is_fallback(),
            "days": enhanced.itinerary.len(),
        })));

        let mut destination = Destination::user_selected(
            &selection,
            parsed.daily_budget,
            format!("User's chosen destination: {selection}"),
        );
        destination.best_for = "User's plan".to_string();

        let mut plan = Plan::new(plan_id, DetailLevel::Enhanced, request, parsed);
        plan.note_fallback("plan_enhancement", &enhanced.fallback);
        plan.destination = Some(destination);
        plan.itinerary = enhanced.itinerary;
        plan.overview = Some(enhanced.overview);
        plan.enhancements_summary = Some(enhanced.enhancements_summary);
        plan.pacing_notes = Some(enhanced.pacing_notes);
        plan.practical_tips = enhanced.practical_tips;
        plan.total_estimated_cost = enhanced.total_estimated_cost;
        plan.hotel_recommendations = enhanced.hotel_recommendations;
        plan.action_performed = Some(enhanced.action_performed);
        plan.original_plan = Some(enhanced.original_plan);
        plan.parse_note = enhanced.parse_note;
        plan.sources = enhanced.sources;
        plan.official_links = enhanced.official_links;

        let timer = ExecutionTrace::start("source_validation");
        let plan = self.validator.validate_plan(plan).await;
        trace.record(timer.output(json!({
            "sources": plan.sources.len(),
            "official_links": plan.official_links.len(),
        })));
        Ok(plan)
    }

    /// Re-run a stored plan with `overrides` laid over its normalized
    /// constraints, at the stored detail level.
    ///
    /// Defaults the first run assumed (such as pace) carry over as if the
    /// caller had sent them.
    pub async fn refine_plan(
        &self,
        plan_id: &str,
        overrides: &Map<String, Value>,
        debug_mode: bool,
    ) -> PlanResult {
        let stored = self
            .require_plan(plan_id)
            .await
            .map_err(|err| PlanFailure::new(plan_id, err))?;
        let base = TravelRequest {
            constraints: stored.parsed_constraints.constraints.clone(),
            ..stored.request.clone()
        };
        let request = base
            .with_overrides(overrides)
            .map_err(|err| PlanFailure::new(plan_id, err))?;

        info!(plan_id, overrides = overrides.len(), "refining plan");
        self.generate_plan(request, stored.level, debug_mode).await
    }

    /// Fresh candidates excluding the stored plan's destination.
    ///
    /// The trace, when requested, rides on the response only; the stored
    /// plan's trace is left alone.
    pub async fn get_alternatives(
        &self,
        plan_id: &str,
        count: usize,
        debug_mode: bool,
    ) -> Result<Alternatives> {
        let stored = self.require_plan(plan_id).await?;
        let current = stored
            .destination
            .as_ref()
            .or_else(|| stored.destinations.first())
            .map(|destination| destination.name.clone())
            .unwrap_or_default();

        let mut trace = ExecutionTrace::new(
            plan_id,
            json!({"plan_id": plan_id, "count": count}),
            stored.level.as_str(),
        );
        let timer = ExecutionTrace::start("destination_recommendation");
        let input = RecommendationInput::new(stored.parsed_constraints.clone(), count + 1);
        let batch = execute(&self.recommender, self.generator.as_ref(), &input).await;
        trace.record(timer.output(serde_json::to_value(&batch)?));

        let alternatives = batch
            .destinations
            .into_iter()
            .filter(|destination| destination.name != current)
            .take(count)
            .collect();

        Ok(Alternatives {
            status: PlanStatus::Success,
            plan_id: plan_id.to_string(),
            alternatives,
            current_destination: current,
            debug_trace: debug_mode.then_some(trace),
        })
    }

    /// Acknowledge a request to re-plan one day; the stored plan is unchanged.
    ///
    /// The day must exist in the stored itinerary.
    pub async fn regenerate_day(
        &self,
        plan_id: &str,
        day_number: u32,
        adjustments: Option<&Value>,
    ) -> Result<DayRegeneration> {
        let stored = self.require_plan(plan_id).await?;
        let day = stored.day(day_number).ok_or_else(|| {
            PlannerError::NotFound(format!("day {day_number} in plan {plan_id}"))
        })?;
        info!(
            plan_id,
            day_number,
            adjusted = adjustments.is_some(),
            "day regeneration acknowledged"
        );
        Ok(DayRegeneration {
            status: PlanStatus::Success,
            plan_id: plan_id.to_string(),
            day_number,
            message: format!(
                "Day {day_number} ({}) regeneration acknowledged; the stored plan is unchanged",
                day.title
            ),
        })
    }

    pub async fn get_plan(&self, plan_id: &str) -> Option<Plan> {
        self.plans.get(plan_id).await
    }

    pub async fn get_trace(&self, plan_id: &str) -> Option<ExecutionTrace> {
        self.traces.get(plan_id).await
    }

    pub async fn list_plans(&self) -> Vec<String> {
        self.plans.list().await
    }

    /// Enrich one activity outside any stored plan; never fails.
    pub async fn enrich_single_activity(
        &self,
        activity: &Activity,
        destination: &str,
        day_number: u32,
    ) -> EnrichedActivity {
        self.activity_enricher
            .enrich_activity(self.generator.as_ref(), activity, destination, day_number)
            .await
    }

    /// Start progressive enrichment of a stored plan.
    ///
    /// Events arrive in traversal order; an unknown plan yields a single
    /// `error` event. Dropping the receiver stops the producer at its next
    /// send.
    pub async fn stream_enrichment(&self, plan_id: &str) -> mpsc::Receiver<EnrichmentEvent> {
        let (events, receiver) = mpsc::channel(STREAM_BUFFER);
        let plan = self.plans.get(plan_id).await;
        let generator = self.generator.clone();
        let enricher = self.activity_enricher.clone();

        tokio::spawn(async move {
            match plan {
                Some(plan) => {
                    enrich_progressively(generator.as_ref(), &enricher, &plan, &events).await
                }
                None => {
                    let _ = events
                        .send(EnrichmentEvent::Error {
                            error: "Plan not found".to_string(),
                        })
                        .await;
                }
            }
        });
        receiver
    }

    async fn require_plan(&self, plan_id: &str) -> Result<Plan> {
        self.plans
            .get(plan_id)
            .await
            .ok_or_else(|| PlannerError::NotFound(format!("plan {plan_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_ids_are_short_hex() {
        let id = new_plan_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(id, new_plan_id());
    }
}
