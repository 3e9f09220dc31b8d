use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    completion_schema,
    error::{PlannerError, Result},
    services::TextGenerator,
    stages::{execute, PromptedStage},
    types::{
        ActivityDetails, BudgetBreakdown, EnrichmentLevel, FallbackInfo, ItineraryDay,
        ItineraryDraft, ParsedConstraints,
    },
};

const DAY_START_HOUR: f64 = 9.0;
const SLOT_HOURS_WHEN_UNPARSED: f64 = 2.0;
const DAILY_MEALS: f64 = 40.0;
const DAILY_TRANSPORT: f64 = 15.0;

const SYSTEM_PROMPT: &str = "You are a detail enrichment agent for a travel planning system.
Add rich details to each itinerary activity, keeping the activities in the order given.

For each activity provide a 2-3 sentence description, a suggested time slot (e.g. \"9:00 AM - 11:00 AM\"), a specific location, an estimated cost in USD, booking info (required, recommended or not_needed), transport notes from the previous stop, 2-3 insider tips, and 1-2 alternatives.

Also provide dining suggestions for the day's meals, a transportation overview, and a budget breakdown.";

/// Enrichment returned for one day; `activities` line up with the day's activities by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct DayEnrichment {
    /// One entry per planned activity, same order
    pub activities: Vec<ActivityDetails>,
    /// Specific restaurant or cafe recommendations for meals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dining_suggestions: Option<Value>,
    /// Daily transportation overview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_summary: Option<Value>,
    /// Estimated daily costs in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_breakdown: Option<BudgetBreakdown>,
}

/// One day plus the context its prompt needs.
#[derive(Debug, Clone)]
pub struct DayInput {
    pub day: ItineraryDay,
    pub destination: String,
    pub daily_budget: f64,
    pub group_type: String,
}

#[derive(Debug, Clone)]
pub struct EnrichedDay {
    pub day: ItineraryDay,
    pub fallback: FallbackInfo,
}

/// Per-day batch enrichment.
#[derive(Debug, Clone, Default)]
pub struct DayEnrichmentStage;

fn format_activities(day: &ItineraryDay) -> String {
    day.activities
        .iter()
        .enumerate()
        .map(|(idx, activity)| {
            format!(
                "{}. {} ({}) - {}",
                idx + 1,
                activity.name,
                activity.duration,
                activity.kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn clock(hours: f64) -> String {
    let minutes = (hours * 60.0).round() as i64;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn day_fallback_cost(kind: &str) -> f64 {
    match kind {
        "dining" => 25.0,
        "sightseeing" | "cultural" => 15.0,
        "adventure" => 50.0,
        _ => 10.0,
    }
}

/// Deterministic enrichment of a whole day.
///
/// Time slots run back to back from 09:00. Fields an activity already has
/// are kept.
pub fn basic_day_enrichment(mut day: ItineraryDay) -> ItineraryDay {
    let mut current = DAY_START_HOUR;

    for activity in day.activities.iter_mut() {
        let hours = activity
            .estimated_duration()
            .hours_or(SLOT_HOURS_WHEN_UNPARSED);
        let end = current + hours;
        let slot = format!("{} - {}", clock(current), clock(end));
        current = end;

        let details = &mut activity.details;
        details.time_slot.get_or_insert(slot);
        details
            .cost_estimate
            .get_or_insert(day_fallback_cost(&activity.kind));
        details.booking_info.get_or_insert_with(|| {
            if activity.priority.eq_ignore_ascii_case("high") {
                "recommended".to_string()
            } else {
                "not_needed".to_string()
            }
        });
        details
            .description
            .get_or_insert_with(|| format!("Enjoy {} - a {} experience.", activity.name, activity.kind));
        if details.tips.is_empty() {
            details.tips = vec![
                "Check opening hours".to_string(),
                "Arrive early to avoid crowds".to_string(),
            ];
        }
    }

    if day.budget_breakdown.is_none() {
        let activities: f64 = day
            .activities
            .iter()
            .filter_map(|activity| activity.details.cost_estimate)
            .sum();
        day.budget_breakdown = Some(BudgetBreakdown {
            accommodation: None,
            activities: Some(activities),
            meals: Some(DAILY_MEALS),
            transport: Some(DAILY_TRANSPORT),
            total: Some(activities + DAILY_MEALS + DAILY_TRANSPORT),
        });
    }

    day
}

impl PromptedStage for DayEnrichmentStage {
    type Input = DayInput;
    type Response = DayEnrichment;
    type Output = EnrichedDay;

    fn name(&self) -> &'static str {
        "day_enrichment"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn temperature(&self) -> f32 {
        0.6
    }

    fn render_prompt(&self, input: &DayInput) -> Result<String> {
        let day = &input.day;
        Ok(format!(
            "Enrich the following day of itinerary with detailed information:

Destination: {}
Day {}: {}
Theme: {}

Activities:
{}

Budget: ${:.0}/day
Group Type: {}

Provide detailed information for each activity including timing, costs, transport, and tips.",
            input.destination,
            day.day_number,
            day.title,
            day.theme,
            format_activities(day),
            input.daily_budget,
            input.group_type,
        ))
    }

    fn finish(&self, enrichment: DayEnrichment, input: &DayInput) -> Result<EnrichedDay> {
        let mut day = input.day.clone();
        for (activity, details) in day.activities.iter_mut().zip(enrichment.activities) {
            activity.enrich_with(details);
        }
        if enrichment.dining_suggestions.is_some() {
            day.dining_suggestions = enrichment.dining_suggestions;
        }
        if enrichment.transport_summary.is_some() {
            day.transport_summary = enrichment.transport_summary;
        }
        if enrichment.budget_breakdown.is_some() {
            day.budget_breakdown = enrichment.budget_breakdown;
        }

        Ok(EnrichedDay {
            day,
            fallback: FallbackInfo::default(),
        })
    }

    fn fallback(&self, input: &DayInput, error: &PlannerError) -> EnrichedDay {
        EnrichedDay {
            day: basic_day_enrichment(input.day.clone()),
            fallback: FallbackInfo::from_error(error),
        }
    }
}

/// Result of enriching a whole itinerary.
#[derive(Debug, Clone)]
pub struct EnrichedItinerary {
    pub itinerary: Vec<ItineraryDay>,
    pub overview: String,
    pub pacing_notes: String,
    pub enrichment_level: EnrichmentLevel,
    /// Per-day errors absorbed by the day fallback.
    pub errors: Vec<String>,
}

impl EnrichedItinerary {
    pub fn fallback_days(&self) -> usize {
        self.errors.len()
    }
}

/// Batch enrichment: one call per day, in day order.
#[derive(Debug, Clone, Default)]
pub struct DetailEnricher {
    day_stage: DayEnrichmentStage,
}

impl DetailEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enrich(
        &self,
        generator: &dyn TextGenerator,
        draft: &ItineraryDraft,
        destination: &str,
        parsed: &ParsedConstraints,
    ) -> EnrichedItinerary {
        let group_type = parsed.constraints.group().unwrap_or("solo").to_string();
        let mut itinerary = Vec::with_capacity(draft.itinerary.len());
        let mut errors = Vec::new();

        for day in &draft.itinerary {
            let input = DayInput {
                day: day.clone(),
                destination: destination.to_string(),
                daily_budget: parsed.daily_budget,
                group_type: group_type.clone(),
            };
            let enriched = execute(&self.day_stage, generator, &input).await;
            if let Some(error) = enriched.fallback.error.as_ref() {
                errors.push(format!("day {}: {error}", day.day_number));
            }
            itinerary.push(enriched.day);
        }

        let all_fell_back = !itinerary.is_empty() && errors.len() == itinerary.len();
        let enrichment_level = if all_fell_back {
            EnrichmentLevel::Basic
        } else {
            EnrichmentLevel::Detailed
        };
        info!(
            days = itinerary.len(),
            fallback_days = errors.len(),
            ?enrichment_level,
            "itinerary enriched"
        );

        EnrichedItinerary {
            itinerary,
            overview: draft.overview.clone(),
            pacing_notes: draft.pacing_notes.clone(),
            enrichment_level,
            errors,
        }
    }
}
