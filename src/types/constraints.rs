use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PlannerError, Result};

/// Default trip length when no usable date range is supplied.
pub const DEFAULT_TRIP_DAYS: i64 = 7;

/// Preferred activity density.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Relaxed,
    #[default]
    Moderate,
    Packed,
}

impl Pace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pace::Relaxed => "relaxed",
            Pace::Moderate => "moderate",
            Pace::Packed => "packed",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Pace::Relaxed => "Relaxed pace - plenty of downtime, 2-3 activities per day",
            Pace::Moderate => "Moderate pace - balanced itinerary, 3-4 activities per day",
            Pace::Packed => "Packed schedule - maximize experiences, 5+ activities per day",
        }
    }
}

/// Spend band derived from the per-day budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    #[default]
    Unspecified,
    Budget,
    Moderate,
    Comfortable,
    Luxury,
}

impl BudgetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::Unspecified => "unspecified",
            BudgetCategory::Budget => "budget",
            BudgetCategory::Moderate => "moderate",
            BudgetCategory::Comfortable => "comfortable",
            BudgetCategory::Luxury => "luxury",
        }
    }
}

/// The traveler's preferences as supplied by the caller.
///
/// Open vocabularies (travel style, group type, travel range) stay strings so
/// that unfamiliar values pass through to the prompts untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// `YYYY-MM-DD to YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_city: Option<String>,
    /// Total trip budget in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<Pace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_events: Vec<Value>,
    /// local | domestic | regional | international
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_range: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_destinations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl Constraints {
    pub fn style(&self) -> Option<&str> {
        non_empty(self.travel_style.as_deref())
    }

    pub fn group(&self) -> Option<&str> {
        non_empty(self.group_type.as_deref())
    }

    pub fn departure(&self) -> Option<&str> {
        non_empty(self.departure_city.as_deref())
    }

    pub fn pace_or_default(&self) -> Pace {
        self.pace.unwrap_or_default()
    }

    /// One line per supplied field, in a stable order.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(dates) = non_empty(self.dates.as_deref()) {
            lines.push(format!("Travel Dates: {dates}"));
        }
        if let Some(city) = self.departure() {
            lines.push(format!("Departure City: {city}"));
        }
        if let Some(budget) = self.budget.filter(|budget| *budget > 0.0) {
            lines.push(format!("Budget: ${budget:.0}"));
        }
        if let Some(style) = self.style() {
            lines.push(format!("Travel Style: {style}"));
        }
        if let Some(range) = non_empty(self.travel_range.as_deref()) {
            lines.push(format!("Travel Range: {range}"));
        }
        if !self.interests.is_empty() {
            lines.push(format!("Interests: {}", self.interests.join(", ")));
        }
        if let Some(pace) = self.pace {
            lines.push(format!("Pace: {}", pace.as_str()));
        }
        if let Some(group) = self.group() {
            lines.push(format!("Group Type: {group}"));
        }
        if let Some(special) = non_empty(self.special_constraints.as_deref()) {
            lines.push(format!("Special Constraints: {special}"));
        }
        if !self.fixed_events.is_empty() {
            lines.push(format!(
                "Fixed Events: {}",
                Value::Array(self.fixed_events.clone())
            ));
        }
        lines
    }
}

/// What the caller wants done with an existing free-text plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    #[default]
    Enhance,
    Modify,
    FillGaps,
    Optimize,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Enhance => "enhance",
            PlanAction::Modify => "modify",
            PlanAction::FillGaps => "fill_gaps",
            PlanAction::Optimize => "optimize",
        }
    }
}

/// Everything a caller may send to start a planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelRequest {
    #[serde(flatten)]
    pub constraints: Constraints,
    /// `"City, Country"`; skips recommendation when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_action: Option<PlanAction>,
}

impl TravelRequest {
    pub fn new(constraints: Constraints) -> Self {
        Self {
            constraints,
            ..Self::default()
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.specific_destination = Some(destination.into());
        self
    }

    pub fn with_existing_plan(mut self, plan: impl Into<String>, action: PlanAction) -> Self {
        self.existing_plan = Some(plan.into());
        self.plan_action = Some(action);
        self
    }

    pub fn destination(&self) -> Option<&str> {
        non_empty(self.specific_destination.as_deref())
    }

    /// True when the caller supplied their own plan text plus a destination.
    pub fn is_enhancement(&self) -> bool {
        self.destination().is_some()
            && self
                .existing_plan
                .as_deref()
                .is_some_and(|plan| !plan.trim().is_empty())
    }

    /// Overlay caller overrides key by key; an override always wins.
    ///
    /// A `null` override clears the field.
    pub fn with_overrides(&self, overrides: &Map<String, Value>) -> Result<Self> {
        let Value::Object(mut merged) = serde_json::to_value(self)? else {
            return Err(PlannerError::Unknown(
                "travel request did not serialize to an object".to_string(),
            ));
        };
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(merged))
            .map_err(|err| PlannerError::Validation(format!("invalid refinement: {err}")))
    }
}

/// Constraints plus everything the normalizer derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedConstraints {
    pub constraints: Constraints,
    /// Trip length in days; below 1 only when the dates conflict.
    pub duration: i64,
    pub budget_category: BudgetCategory,
    /// Budget per day in USD, 0 when no budget was given.
    pub daily_budget: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl ParsedConstraints {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
