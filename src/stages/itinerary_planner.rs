use tracing::warn;

use crate::{
    error::{PlannerError, Result},
    stages::PromptedStage,
    types::{Activity, Destination, FallbackInfo, ItineraryDay, ItineraryDraft, ParsedConstraints},
};

/// Longest itinerary the fallback will synthesize.
pub const MAX_FALLBACK_DAYS: i64 = 7;

const SYSTEM_PROMPT: &str = "You are an itinerary planning agent for a travel planning system.
Create a structured day-by-day itinerary for the chosen destination.

For each day give a brief title, a theme, 3-5 activities (name, duration such as \"2 hours\", type such as sightseeing, dining, adventure, cultural, relaxation or logistics, and a priority of high, medium or low), notes, and a flexibility of rigid, moderate or flexible.

Consider logical flow and geographic clustering, energy levels after arrival, meal times, travel time between activities, a mix of must-see attractions and hidden gems, free time, and the traveler's pace preference.";

#[derive(Debug, Clone)]
pub struct PlanningInput {
    pub destination: Destination,
    pub parsed: ParsedConstraints,
}

impl PlanningInput {
    pub fn new(destination: Destination, parsed: ParsedConstraints) -> Self {
        Self {
            destination,
            parsed,
        }
    }
}

/// Day-by-day skeleton for one destination.
#[derive(Debug, Clone, Default)]
pub struct ItineraryPlanner;

fn day(
    day_number: u32,
    title: impl Into<String>,
    theme: &str,
    activities: Vec<Activity>,
    notes: &str,
    flexibility: &str,
) -> ItineraryDay {
    let mut day = ItineraryDay {
        day_number,
        title: title.into(),
        theme: theme.to_string(),
        activities,
        notes: notes.to_string(),
        flexibility: flexibility.to_string(),
        ..ItineraryDay::default()
    };
    day.refresh_metrics();
    day
}

/// Canned skeleton: arrival day, exploration days, departure day.
pub fn fallback_days(destination: &str, duration: i64) -> Vec<ItineraryDay> {
    let last = duration.min(MAX_FALLBACK_DAYS);
    (1..=last)
        .map(|number| {
            let day_number = number as u32;
            if number == 1 {
                day(
                    day_number,
                    "Arrival & Orientation",
                    "Getting settled",
                    vec![
                        Activity::new("Check-in to accommodation", "1 hour", "logistics", "high"),
                        Activity::new("Explore neighborhood", "2 hours", "exploration", "medium"),
                        Activity::new("Welcome dinner", "2 hours", "dining", "medium"),
                    ],
                    "Take it easy on arrival day",
                    "flexible",
                )
            } else if number == duration {
                day(
                    day_number,
                    "Departure Day",
                    "Last moments",
                    vec![
                        Activity::new(
                            "Final exploration or souvenir shopping",
                            "2 hours",
                            "shopping",
                            "low",
                        ),
                        Activity::new("Check-out and departure", "2 hours", "logistics", "high"),
                    ],
                    "Leave time for travel to airport",
                    "rigid",
                )
            } else {
                day(
                    day_number,
                    format!("Exploring {destination} - Day {number}"),
                    "Main attractions",
                    vec![
                        Activity::new("Morning activity", "3 hours", "sightseeing", "high"),
                        Activity::new("Lunch", "1.5 hours", "dining", "medium"),
                        Activity::new("Afternoon activity", "3 hours", "sightseeing", "high"),
                        Activity::new("Evening experience", "2 hours", "cultural", "medium"),
                    ],
                    "Full day of exploration",
                    "moderate",
                )
            }
        })
        .collect()
}

impl PromptedStage for ItineraryPlanner {
    type Input = PlanningInput;
    type Response = ItineraryDraft;
    type Output = ItineraryDraft;

    fn name(&self) -> &'static str {
        "itinerary_planning"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn render_prompt(&self, input: &PlanningInput) -> Result<String> {
        let parsed = &input.parsed;
        let constraints = &parsed.constraints;
        let destination = &input.destination;
        let interests = if constraints.interests.is_empty() {
            "General".to_string()
        } else {
            constraints.interests.join(", ")
        };
        let considerations = if destination.considerations.trim().is_empty() {
            "None"
        } else {
            destination.considerations.as_str()
        };

        Ok(format!(
            "Create a detailed {duration}-day itinerary for {name}.

Destination Highlights: {highlights}

Traveler Profile:
- Pace: {pace}
- Travel Style: {style}
- Interests: {interests}
- Group Type: {group}

Special Considerations:
{considerations}

Budget Category: {category}
Daily Budget: ${daily:.0}

Create a balanced itinerary that maximizes the experience while respecting the traveler's preferences and constraints.",
            duration = parsed.duration,
            name = destination.name,
            highlights = destination.highlights.join(", "),
            pace = constraints.pace_or_default().describe(),
            style = constraints.style().unwrap_or("cultural"),
            group = constraints.group().unwrap_or("solo"),
            category = parsed.budget_category.as_str(),
            daily = parsed.daily_budget,
        ))
    }

    fn finish(&self, mut draft: ItineraryDraft, input: &PlanningInput) -> Result<ItineraryDraft> {
        let expected = input.parsed.duration;
        let actual = draft.itinerary.len();
        if actual as i64 != expected {
            warn!(expected, actual, "itinerary length differs from trip duration");
            draft
                .warnings
                .push(format!("Expected {expected} days, got {actual}"));
        }

        for day in draft.itinerary.iter_mut() {
            day.refresh_metrics();
        }
        Ok(draft)
    }

    fn fallback(&self, input: &PlanningInput, error: &PlannerError) -> ItineraryDraft {
        let duration = input.parsed.duration;
        let name = &input.destination.name;
        ItineraryDraft {
            itinerary: fallback_days(name, duration),
            overview: format!("Basic {duration}-day itinerary for {name}"),
            pacing_notes: "Moderate pacing with flexibility".to_string(),
            warnings: Vec::new(),
            fallback: FallbackInfo::from_error(error),
        }
    }
}
