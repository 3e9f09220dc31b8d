//! Pipeline stages.
//!
//! Every model-backed stage implements [`PromptedStage`] and is driven by
//! [`execute`], which never fails: any error on the model path is turned
//! into the stage's deterministic fallback output.

pub mod activity_enricher;
pub mod constraint_normalizer;
pub mod destination_recommender;
pub mod detail_enricher;
pub mod itinerary_planner;
pub mod plan_enhancer;

use tracing::{debug, error, info, warn};

use crate::{
    error::{PlannerError, Result},
    schemas::{decode_structured, schema_instructions, CompletionSchema},
    services::{parse_structured, GenerationRequest, TextGenerator},
};

pub use activity_enricher::{ActivityCategory, ActivityEnricher, TransportRequest};
pub use constraint_normalizer::normalize;
pub use destination_recommender::{DestinationRecommender, RecommendationInput};
pub use detail_enricher::{DetailEnricher, EnrichedItinerary};
pub use itinerary_planner::{ItineraryPlanner, PlanningInput};
pub use plan_enhancer::{EnhancedPlan, EnhancementInput, PlanEnhancer};

/// Prompt, generate, parse, validate; fall back on any failure.
pub trait PromptedStage: Send + Sync {
    type Input: Send + Sync;
    /// Shape requested from the model.
    type Response: CompletionSchema;
    type Output: Send;

    fn name(&self) -> &'static str;

    fn system_prompt(&self) -> &str;

    fn temperature(&self) -> f32 {
        0.7
    }

    /// Model override; `None` uses the generator's default.
    fn model(&self) -> Option<&str> {
        None
    }

    /// Completion length cap; `None` leaves it to the provider.
    fn max_tokens(&self) -> Option<u32> {
        None
    }

    fn render_prompt(&self, input: &Self::Input) -> Result<String>;

    /// Stage-specific validation of a decoded response.
    fn finish(&self, response: Self::Response, input: &Self::Input) -> Result<Self::Output>;

    /// Deterministic output used when the model path fails.
    fn fallback(&self, input: &Self::Input, error: &PlannerError) -> Self::Output;
}

/// Run the model path only, surfacing its error.
pub async fn attempt<S: PromptedStage>(
    stage: &S,
    generator: &dyn TextGenerator,
    input: &S::Input,
) -> Result<S::Output> {
    let prompt = stage.render_prompt(input)?;
    let user_prompt = format!(
        "{prompt}\n\n{}",
        schema_instructions(S::Response::schema())
    );

    let mut request = GenerationRequest::new(stage.system_prompt(), user_prompt)
        .with_temperature(stage.temperature());
    if let Some(model) = stage.model() {
        request = request.with_model(model);
    }
    if let Some(max_tokens) = stage.max_tokens() {
        request = request.with_max_tokens(max_tokens);
    }

    info!(stage = stage.name(), "sending stage prompt");
    let raw = generator.generate(&request).await?;
    debug!(stage = stage.name(), chars = raw.len(), "stage response received");

    let payload = parse_structured(&raw)?;
    let response = decode_structured::<S::Response>(&payload)?;
    stage.finish(response, input)
}

/// Run a stage; never fails.
///
/// Errors outside the model path (see [`PlannerError::is_stage_local`]) also
/// fall back, but are logged at error level.
pub async fn execute<S: PromptedStage>(
    stage: &S,
    generator: &dyn TextGenerator,
    input: &S::Input,
) -> S::Output {
    match attempt(stage, generator, input).await {
        Ok(output) => output,
        Err(err) if err.is_stage_local() => {
            warn!(stage = stage.name(), error = %err, "stage failed, using fallback");
            stage.fallback(input, &err)
        }
        Err(err) => {
            error!(stage = stage.name(), error = %err, "stage broke outside the model path, using fallback");
            stage.fallback(input, &err)
        }
    }
}
