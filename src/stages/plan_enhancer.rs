use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    completion_schema,
    config::PlannerConfig,
    error::{PlannerError, Result},
    services::{GenerationRequest, TextGenerator},
    stages::{execute, PromptedStage},
    types::{
        Activity, FallbackInfo, HotelOption, ItineraryDay, ParsedConstraints, PlanAction,
    },
};

const SYSTEM_PROMPT: &str = "You are an expert travel planner who enhances and improves travel itineraries with detailed, practical information.";
const ADVISORY_SYSTEM_PROMPT: &str =
    "You are a seasoned local travel advisor reviewing a traveler's draft plan.";

const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(20);
/// The full-plan schema needs room.
const ENHANCEMENT_MAX_TOKENS: u32 = 3000;
const ACTIVITY_NAME_CHARS: usize = 100;
const UNSEGMENTED_DESCRIPTION_CHARS: usize = 500;
const SEGMENTED_NOTE: &str = "Structured format created from your plan text";

fn action_instructions(action: PlanAction) -> &'static str {
    match action {
        PlanAction::Enhance => "Enhance the user's plan with:
- Specific timing for each activity (morning, afternoon, evening with approximate hours)
- Estimated costs for activities, meals, and transportation
- Practical tips and recommendations
- Transportation details between locations
- Meal suggestions near each activity
Keep the user's original structure and activities intact.",
        PlanAction::Modify => "Improve and modify the user's plan by:
- Optimizing the order of activities for better flow
- Suggesting better alternatives if activities don't fit well together
- Adding or replacing activities that better match their preferences
- Balancing the daily pace according to their preferred pace
- Adjusting for budget constraints",
        PlanAction::FillGaps => "Fill in the gaps in the user's plan by:
- Adding activities for any unplanned time periods
- Suggesting meals and restaurants for breakfast, lunch, and dinner
- Adding transportation between activities
- Including rest breaks and free time
- Suggesting evening activities if days end early",
        PlanAction::Optimize => "Optimize the user's plan by:
- Reorganizing activities to minimize travel time and backtracking
- Grouping nearby attractions together
- Adjusting timing to avoid crowds when possible
- Ensuring realistic time allocations for each activity
- Balancing energy levels throughout each day",
    }
}

/// A caller's free-text plan plus what to do with it.
#[derive(Debug, Clone)]
pub struct EnhancementInput {
    pub existing_plan: String,
    pub destination: String,
    pub parsed: ParsedConstraints,
    pub action: PlanAction,
    /// Secondary-model review folded into the prompt when available.
    pub advisory_notes: Option<String>,
}

impl EnhancementInput {
    pub fn new(
        existing_plan: impl Into<String>,
        destination: impl Into<String>,
        parsed: ParsedConstraints,
        action: PlanAction,
    ) -> Self {
        Self {
            existing_plan: existing_plan.into(),
            destination: destination.into(),
            parsed,
            action,
            advisory_notes: None,
        }
    }
}

/// Consolidated itinerary requested from the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct EnhancedPlanDraft {
    /// Brief overview of the enhanced plan (2-3 sentences)
    #[serde(default)]
    pub overview: String,
    /// What was improved or added (2-3 sentences)
    #[serde(default)]
    pub enhancements_summary: String,
    /// Estimated trip total in USD, number or text
    #[serde(default)]
    pub total_estimated_cost: Option<Value>,
    /// Three to five hotels with price ranges and locations
    #[serde(default)]
    pub hotel_recommendations: Vec<HotelOption>,
    /// Day-by-day plan keeping the traveler's structure
    pub itinerary: Vec<ItineraryDay>,
    /// Overall pace and energy distribution
    #[serde(default)]
    pub pacing_notes: String,
    #[serde(default)]
    pub practical_tips: Vec<String>,
    /// Real, existing websites only
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub official_links: Vec<String>,
}

/// Structured result of the enhancement path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPlan {
    pub overview: String,
    pub enhancements_summary: String,
    pub total_estimated_cost: Option<String>,
    pub hotel_recommendations: Vec<HotelOption>,
    pub itinerary: Vec<ItineraryDay>,
    pub pacing_notes: String,
    pub practical_tips: Vec<String>,
    pub sources: Vec<String>,
    pub official_links: Vec<String>,
    pub action_performed: PlanAction,
    pub original_plan: String,
    /// Set when the itinerary was segmented from the plan text.
    pub parse_note: Option<String>,
    #[serde(flatten)]
    pub fallback: FallbackInfo,
}

fn cost_text(cost: Option<Value>) -> Option<String> {
    match cost? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text),
        Value::Number(number) => Some(format!("${number}")),
        other => Some(other.to_string()),
    }
}

fn first_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Number of a day-marker line: its first run of digits.
fn marker_day_number(line: &str) -> Option<u32> {
    let digits: String = line
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn is_day_marker(line: &str) -> bool {
    line.to_lowercase().contains("day") && line.chars().any(|ch| ch.is_ascii_digit())
}

/// Split free-text plan lines into days.
///
/// A line mentioning "day" together with a digit opens a new day; the
/// lines after it become that day's activities. Lines before the first
/// marker are dropped. Text without any marker becomes a single day.
pub fn segment_plan(text: &str) -> Vec<ItineraryDay> {
    let mut days: Vec<ItineraryDay> = Vec::new();
    let mut current: Option<ItineraryDay> = None;

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if is_day_marker(line) {
            if let Some(day) = current.take() {
                days.push(day);
            }
            let day_number =
                marker_day_number(line).unwrap_or_else(|| days.len() as u32 + 1);
            current = Some(ItineraryDay {
                day_number,
                title: line.to_string(),
                theme: "As planned".to_string(),
                ..ItineraryDay::default()
            });
        } else if let Some(day) = current.as_mut() {
            let mut activity = Activity::new(
                first_chars(line, ACTIVITY_NAME_CHARS),
                "",
                "planned_activity",
                "medium",
            );
            activity.details.time_slot = Some("See plan".to_string());
            activity.details.description = Some(line.to_string());
            day.activities.push(activity);
        }
    }
    days.extend(current);

    if days.is_empty() {
        let mut activity = Activity::new("Your planned activities", "", "planned_activity", "medium");
        activity.details.description = Some(first_chars(text.trim(), UNSEGMENTED_DESCRIPTION_CHARS));
        days.push(ItineraryDay {
            day_number: 1,
            title: "Day 1".to_string(),
            theme: "Your itinerary".to_string(),
            activities: vec![activity],
            ..ItineraryDay::default()
        });
    }

    for day in days.iter_mut() {
        day.refresh_metrics();
    }
    days
}

#[derive(Debug, Clone, Default)]
struct EnhancementStage;

impl PromptedStage for EnhancementStage {
    type Input = EnhancementInput;
    type Response = EnhancedPlanDraft;
    type Output = EnhancedPlan;

    fn name(&self) -> &'static str {
        "plan_enhancement"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn max_tokens(&self) -> Option<u32> {
        Some(ENHANCEMENT_MAX_TOKENS)
    }

    fn render_prompt(&self, input: &EnhancementInput) -> Result<String> {
        let constraints = &input.parsed.constraints;
        let destination = &input.destination;
        let budget = constraints
            .budget
            .filter(|budget| *budget > 0.0)
            .map(|budget| format!("${budget:.0} total"))
            .unwrap_or_else(|| "Not specified".to_string());
        let interests = if constraints.interests.is_empty() {
            "General sightseeing".to_string()
        } else {
            constraints.interests.join(", ")
        };
        let advisory = input
            .advisory_notes
            .as_deref()
            .map(|notes| format!("\nADDITIONAL EXPERT INPUT:\n{notes}\n"))
            .unwrap_or_default();

        Ok(format!(
            "You are an expert travel planner helping to enhance a traveler's existing plan for {destination}.

USER'S EXISTING PLAN:
{plan}

TRAVEL DETAILS:
- Destination: {destination}
- Dates: {dates}
- Budget: {budget}
- Pace: {pace}
- Travel Style: {style}
- Group Type: {group}
- Interests: {interests}
{advisory}
ACTION REQUESTED: {action}
{instructions}

IMPORTANT GUIDELINES:
1. Maintain respect for the user's original ideas and preferences
2. Provide specific details: exact timing, actual costs, real names for hotels and restaurants
3. For accommodation or check-in activities include 2-3 specific hotel examples with names, prices and amenities
4. For dining activities include 2-3 specific restaurant recommendations with cuisine type and price range
5. Include practical information: opening hours, booking requirements, dress codes
6. Be realistic about time and account for waiting, meals and rest
7. Include 3-5 hotel recommendations with price ranges and locations at the top level
8. Include official website links and credible sources where helpful
9. Do not include phone numbers or reservation contacts
10. Only include real, existing websites",
            plan = input.existing_plan,
            dates = constraints.dates.as_deref().unwrap_or("Not specified"),
            pace = constraints.pace_or_default().describe(),
            style = constraints.style().unwrap_or("Not specified"),
            group = constraints.group().unwrap_or("Not specified"),
            action = input.action.as_str().to_uppercase(),
            instructions = action_instructions(input.action),
        ))
    }

    fn finish(&self, draft: EnhancedPlanDraft, input: &EnhancementInput) -> Result<EnhancedPlan> {
        if draft.itinerary.is_empty() {
            return Err(PlannerError::Format(
                "enhanced plan contains no days".to_string(),
            ));
        }

        let mut itinerary = draft.itinerary;
        for day in itinerary.iter_mut() {
            day.refresh_metrics();
        }

        Ok(EnhancedPlan {
            overview: draft.overview,
            enhancements_summary: draft.enhancements_summary,
            total_estimated_cost: cost_text(draft.total_estimated_cost),
            hotel_recommendations: draft.hotel_recommendations,
            itinerary,
            pacing_notes: draft.pacing_notes,
            practical_tips: draft.practical_tips,
            sources: draft.sources,
            official_links: draft.official_links,
            action_performed: input.action,
            original_plan: input.existing_plan.clone(),
            parse_note: None,
            fallback: FallbackInfo::default(),
        })
    }

    fn fallback(&self, input: &EnhancementInput, error: &PlannerError) -> EnhancedPlan {
        EnhancedPlan {
            overview: "Enhanced itinerary based on your plan".to_string(),
            enhancements_summary: format!("Applied {} to your travel plan", input.action.as_str()),
            itinerary: segment_plan(&input.existing_plan),
            pacing_notes: format!(
                "Itinerary enhanced with {} pace in mind",
                input.parsed.constraints.pace_or_default().as_str()
            ),
            practical_tips: vec![
                "Check opening hours before visiting".to_string(),
                "Book popular attractions in advance".to_string(),
            ],
            action_performed: input.action,
            original_plan: input.existing_plan.clone(),
            parse_note: Some(SEGMENTED_NOTE.to_string()),
            fallback: FallbackInfo::from_error(error),
            ..EnhancedPlan::default()
        }
    }
}

/// Turns a caller's free-text plan into a structured itinerary.
///
/// With an advisory model configured, a second opinion is requested on a
/// background task; whatever it has produced by the deadline is folded
/// into the prompt, and a late answer is discarded.
#[derive(Debug, Clone)]
pub struct PlanEnhancer {
    advisory_model: Option<String>,
    advisory_timeout: Duration,
}

impl Default for PlanEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanEnhancer {
    pub fn new() -> Self {
        Self {
            advisory_model: None,
            advisory_timeout: DEFAULT_ADVISORY_TIMEOUT,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            advisory_model: config.advisory_model.clone(),
            advisory_timeout: config.advisory_timeout,
        }
    }

    pub fn with_advisory(mut self, model: impl Into<String>, timeout: Duration) -> Self {
        self.advisory_model = Some(model.into());
        self.advisory_timeout = timeout;
        self
    }

    /// Fails only when there is no plan text to work from.
    pub async fn enhance(
        &self,
        generator: Arc<dyn TextGenerator>,
        mut input: EnhancementInput,
    ) -> Result<EnhancedPlan> {
        if input.existing_plan.trim().is_empty() {
            return Err(PlannerError::Validation(
                "existing_plan must not be empty".to_string(),
            ));
        }

        info!(
            destination = %input.destination,
            action = input.action.as_str(),
            "enhancing existing plan"
        );
        input.advisory_notes = self.consult_advisor(generator.clone(), &input).await;

        Ok(execute(&EnhancementStage, generator.as_ref(), &input).await)
    }

    async fn consult_advisor(
        &self,
        generator: Arc<dyn TextGenerator>,
        input: &EnhancementInput,
    ) -> Option<String> {
        let model = self.advisory_model.as_ref()?;
        let request = GenerationRequest::new(
            ADVISORY_SYSTEM_PROMPT,
            format!(
                "Review this travel plan for {} and list the most valuable improvements for a '{}' request. Answer in plain text.\n\n{}",
                input.destination,
                input.action.as_str(),
                input.existing_plan
            ),
        )
        .with_model(model.clone())
        .with_max_retries(1);

        let task = tokio::spawn(async move { generator.generate(&request).await });

        match tokio::time::timeout(self.advisory_timeout, task).await {
            Ok(Ok(Ok(notes))) if !notes.trim().is_empty() => {
                debug!(chars = notes.len(), "advisory notes received");
                Some(notes)
            }
            Ok(Ok(Ok(_))) => None,
            Ok(Ok(Err(err))) => {
                debug!(error = %err, "advisory pass failed");
                None
            }
            Ok(Err(err)) => {
                warn!(error = %err, "advisory task aborted");
                None
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.advisory_timeout.as_secs_f64(),
                    "advisory pass timed out, continuing without it"
                );
                None
            }
        }
    }
}
