use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::completion_schema;
use crate::types::FallbackInfo;

/// Hours charged for a duration that cannot be read.
pub const UNPARSED_DURATION_HOURS: f64 = 1.0;
/// Days above this many planned hours get a packing warning.
pub const PACKED_DAY_HOURS: f64 = 12.0;

/// Unit of a free-text activity duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Minutes,
    Hours,
}

/// Best-effort reading of a free-text duration such as `"2 hours"` or `"45 min"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationEstimate {
    Parsed { magnitude: f64, unit: DurationUnit },
    Unparsed,
}

impl DurationEstimate {
    /// Reads the numeric prefix of the first token; anything mentioning
    /// minutes is minutes, everything else is taken as hours.
    pub fn parse(text: &str) -> Self {
        let Some(first) = text.split_whitespace().next() else {
            return DurationEstimate::Unparsed;
        };

        let numeric: String = first
            .chars()
            .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
            .collect();
        let Ok(magnitude) = numeric.parse::<f64>() else {
            return DurationEstimate::Unparsed;
        };
        if !magnitude.is_finite() || magnitude < 0.0 {
            return DurationEstimate::Unparsed;
        }

        let lowered = text.to_lowercase();
        let unit = if lowered.contains("min") {
            DurationUnit::Minutes
        } else {
            DurationUnit::Hours
        };

        DurationEstimate::Parsed { magnitude, unit }
    }

    /// Duration in hours, or `default` when unparsed.
    pub fn hours_or(&self, default: f64) -> f64 {
        match self {
            DurationEstimate::Parsed {
                magnitude,
                unit: DurationUnit::Hours,
            } => *magnitude,
            DurationEstimate::Parsed {
                magnitude,
                unit: DurationUnit::Minutes,
            } => magnitude / 60.0,
            DurationEstimate::Unparsed => default,
        }
    }

    pub fn hours(&self) -> f64 {
        self.hours_or(UNPARSED_DURATION_HOURS)
    }
}

/// A hotel suggestion attached to a lodging activity or an enhanced plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HotelOption {
    pub name: String,
    /// Budget, Mid-Range, Upscale or Luxury
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// e.g. "$100-150 per night"
    #[serde(default, alias = "price_per_night", skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_for: Option<String>,
}

/// A restaurant suggestion attached to a dining activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RestaurantOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// "$" to "$$$$"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialties: Option<String>,
}

/// Price and opening-hour snippets lifted from a linked page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDetails {
    pub found_prices: Vec<String>,
    pub found_hours: Vec<String>,
    pub source_url: String,
}

/// Everything enrichment may add to a planned activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityDetails {
    /// Two or three sentence description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Suggested time, e.g. "9:00 AM - 11:00 AM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    /// Specific address or area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Estimated cost per person in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
    /// Free-text pricing notes such as entrance fees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_details: Option<String>,
    /// required, recommended or not_needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_info: Option<String>,
    /// Official or booking website
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_url: Option<String>,
    /// How to get there from the previous stop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
    /// Fallback options if this one does not work out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
    /// open, closed or limited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closure_notice: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hotel_examples: Vec<HotelOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restaurant_options: Vec<RestaurantOption>,
    /// Credible source URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub official_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub page_details: Option<PageDetails>,
}

impl ActivityDetails {
    /// Take every value `incoming` supplies; keep current values elsewhere.
    pub fn absorb(&mut self, incoming: ActivityDetails) {
        replace_if_some(&mut self.description, incoming.description);
        replace_if_some(&mut self.time_slot, incoming.time_slot);
        replace_if_some(&mut self.location, incoming.location);
        replace_if_some(&mut self.cost_estimate, incoming.cost_estimate);
        replace_if_some(&mut self.cost_details, incoming.cost_details);
        replace_if_some(&mut self.booking_info, incoming.booking_info);
        replace_if_some(&mut self.booking_url, incoming.booking_url);
        replace_if_some(&mut self.transport_notes, incoming.transport_notes);
        replace_if_filled(&mut self.tips, incoming.tips);
        replace_if_filled(&mut self.alternatives, incoming.alternatives);
        replace_if_some(&mut self.availability_status, incoming.availability_status);
        replace_if_some(&mut self.closure_notice, incoming.closure_notice);
        replace_if_filled(&mut self.hotel_examples, incoming.hotel_examples);
        replace_if_filled(&mut self.restaurant_options, incoming.restaurant_options);
        replace_if_filled(&mut self.sources, incoming.sources);
        replace_if_filled(&mut self.official_links, incoming.official_links);
        replace_if_some(&mut self.page_details, incoming.page_details);
    }

    /// First link worth following for page details.
    pub fn primary_link(&self) -> Option<&str> {
        self.booking_url
            .as_deref()
            .or_else(|| self.sources.first().map(String::as_str))
            .filter(|link| !link.trim().is_empty())
    }
}

fn replace_if_some<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

fn replace_if_filled<T>(slot: &mut Vec<T>, incoming: Vec<T>) {
    if !incoming.is_empty() {
        *slot = incoming;
    }
}

/// A planned activity. The planned fields are never touched by enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Activity {
    /// Activity name
    pub name: String,
    /// Estimated duration, e.g. "2 hours"
    #[serde(default)]
    pub duration: String,
    /// sightseeing, dining, adventure, cultural, relaxation, logistics, transport, ...
    #[serde(default, rename = "type")]
    pub kind: String,
    /// high, medium or low
    #[serde(default)]
    pub priority: String,
    #[serde(flatten)]
    pub details: ActivityDetails,
}

impl Activity {
    pub fn new(
        name: impl Into<String>,
        duration: impl Into<String>,
        kind: impl Into<String>,
        priority: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            duration: duration.into(),
            kind: kind.into(),
            priority: priority.into(),
            details: ActivityDetails::default(),
        }
    }

    pub fn estimated_duration(&self) -> DurationEstimate {
        DurationEstimate::parse(&self.duration)
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority.eq_ignore_ascii_case("high")
    }

    /// Additive merge of enrichment output.
    pub fn enrich_with(&mut self, details: ActivityDetails) {
        self.details.absorb(details);
    }
}

/// Day-level cost estimate in USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meals: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// One day of an itinerary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItineraryDay {
    /// 1-based day counter
    pub day_number: u32,
    /// Brief title, e.g. "Arrival & City Orientation"
    #[serde(default)]
    pub title: String,
    /// Main focus of the day
    #[serde(default)]
    pub theme: String,
    /// Activities in chronological order
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub notes: String,
    /// rigid, moderate or flexible
    #[serde(default)]
    pub flexibility: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dining_suggestions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_summary: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_breakdown: Option<BudgetBreakdown>,
    #[serde(default)]
    #[schemars(skip)]
    pub activity_count: usize,
    #[serde(default)]
    #[schemars(skip)]
    pub high_priority_count: usize,
    #[serde(default)]
    #[schemars(skip)]
    pub estimated_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub packing_warning: Option<String>,
}

impl ItineraryDay {
    /// Recompute the derived counters from the activity list.
    pub fn refresh_metrics(&mut self) {
        self.activity_count = self.activities.len();
        self.high_priority_count = self
            .activities
            .iter()
            .filter(|activity| activity.is_high_priority())
            .count();
        self.estimated_hours = self
            .activities
            .iter()
            .map(|activity| activity.estimated_duration().hours())
            .sum();
        self.packing_warning = (self.estimated_hours > PACKED_DAY_HOURS)
            .then(|| "Day may be too packed".to_string());
    }
}

/// Day-by-day skeleton for one destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct ItineraryDraft {
    /// One entry per trip day, numbered from 1
    pub itinerary: Vec<ItineraryDay>,
    /// Brief overview of the itinerary approach
    #[serde(default)]
    pub overview: String,
    /// Notes about overall pacing
    #[serde(default)]
    pub pacing_notes: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(skip)]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub fallback: FallbackInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parsing() {
        assert_eq!(
            DurationEstimate::parse("2 hours"),
            DurationEstimate::Parsed {
                magnitude: 2.0,
                unit: DurationUnit::Hours
            }
        );
        assert_eq!(DurationEstimate::parse("1.5 hours").hours(), 1.5);
        assert_eq!(DurationEstimate::parse("90 minutes").hours(), 1.5);
        assert_eq!(DurationEstimate::parse("3h").hours(), 3.0);
        assert_eq!(DurationEstimate::parse("half a day"), DurationEstimate::Unparsed);
        assert_eq!(DurationEstimate::parse("").hours(), UNPARSED_DURATION_HOURS);
        assert_eq!(DurationEstimate::parse("all day").hours_or(2.0), 2.0);
    }

    #[test]
    fn test_refresh_metrics_flags_packed_days() {
        let mut day = ItineraryDay {
            day_number: 1,
            activities: vec![
                Activity::new("Hike", "6 hours", "adventure", "high"),
                Activity::new("Museum", "4 hours", "cultural", "medium"),
                Activity::new("Dinner", "whenever", "dining", "High"),
                Activity::new("Night market", "2.5 hours", "cultural", "low"),
            ],
            ..ItineraryDay::default()
        };

        day.refresh_metrics();

        assert_eq!(day.activity_count, 4);
        assert_eq!(day.high_priority_count, 2);
        assert_eq!(day.estimated_hours, 13.5);
        assert!(day.packing_warning.is_some());
    }

    #[test]
    fn test_enrichment_keeps_planned_fields() {
        let mut activity = Activity::new("Alhambra", "3 hours", "cultural", "high");
        activity.enrich_with(ActivityDetails {
            description: Some("Moorish palace complex".to_string()),
            tips: vec!["Book ahead".to_string()],
            ..ActivityDetails::default()
        });
        activity.enrich_with(ActivityDetails {
            time_slot: Some("9:00 AM - 12:00 PM".to_string()),
            ..ActivityDetails::default()
        });

        assert_eq!(activity.name, "Alhambra");
        assert_eq!(activity.kind, "cultural");
        assert_eq!(activity.priority, "high");
        assert_eq!(
            activity.details.description.as_deref(),
            Some("Moorish palace complex")
        );
        assert_eq!(activity.details.tips, vec!["Book ahead".to_string()]);
        assert_eq!(
            activity.details.time_slot.as_deref(),
            Some("9:00 AM - 12:00 PM")
        );
    }

    #[test]
    fn test_activity_serializes_flat() {
        let mut activity = Activity::new("Lunch", "1 hour", "dining", "medium");
        activity.details.cost_estimate = Some(25.0);
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["type"], "dining");
        assert_eq!(value["cost_estimate"], 25.0);
        assert!(value.get("details").is_none());
    }
}
