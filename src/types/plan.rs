use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::error::PlannerError;
use crate::types::{
    constraints::{ParsedConstraints, PlanAction, TravelRequest},
    destination::Destination,
    itinerary::{HotelOption, ItineraryDay},
    trace::ExecutionTrace,
    FallbackInfo,
};

/// How deep a planning run goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Ranked destinations only.
    HighLevel,
    /// Destination plus an itinerary skeleton.
    Medium,
    /// Skeleton plus per-day enrichment.
    #[default]
    Full,
    /// Built from a caller-supplied plan.
    Enhanced,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::HighLevel => "high_level",
            DetailLevel::Medium => "medium",
            DetailLevel::Full => "full",
            DetailLevel::Enhanced => "enhanced",
        }
    }
}

impl std::str::FromStr for DetailLevel {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "high_level" => Ok(DetailLevel::HighLevel),
            "medium" => Ok(DetailLevel::Medium),
            "full" => Ok(DetailLevel::Full),
            "enhanced" => Ok(DetailLevel::Enhanced),
            other => Err(PlannerError::Validation(format!(
                "unknown detail level `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentLevel {
    Detailed,
    Basic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Success,
    Error,
}

/// The stored result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub status: PlanStatus,
    pub level: DetailLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    /// Ranked candidates, high-level plans only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<Destination>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub itinerary: Vec<ItineraryDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_destinations: Vec<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_notes: Option<String>,
    /// Recommendation approach, high-level plans only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_level: Option<EnrichmentLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancements_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hotel_recommendations: Vec<HotelOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub practical_tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_performed: Option<PlanAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_plan: Option<String>,
    /// Set when the caller's plan text had to be segmented heuristically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub official_links: Vec<String>,
    pub parsed_constraints: ParsedConstraints,
    /// The request this plan was built from; refinements start here.
    pub request: TravelRequest,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// Seconds spent producing the plan.
    pub processing_time: f64,
    /// True when any stage returned its fallback output.
    #[serde(default)]
    pub fallback_mode: bool,
    /// Errors absorbed by stage fallbacks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_trace: Option<ExecutionTrace>,
}

impl Plan {
    pub fn new(
        plan_id: impl Into<String>,
        level: DetailLevel,
        request: TravelRequest,
        parsed_constraints: ParsedConstraints,
    ) -> Self {
        let warnings = parsed_constraints.warnings.clone();
        let assumptions = parsed_constraints.assumptions.clone();
        Self {
            plan_id: plan_id.into(),
            status: PlanStatus::Success,
            level,
            destination: None,
            destinations: Vec::new(),
            itinerary: Vec::new(),
            alternative_destinations: Vec::new(),
            overview: None,
            pacing_notes: None,
            reasoning: None,
            enrichment_level: None,
            enhancements_summary: None,
            total_estimated_cost: None,
            hotel_recommendations: Vec::new(),
            practical_tips: Vec::new(),
            action_performed: None,
            original_plan: None,
            parse_note: None,
            sources: Vec::new(),
            official_links: Vec::new(),
            parsed_constraints,
            request,
            warnings,
            assumptions,
            processing_time: 0.0,
            fallback_mode: false,
            errors: Vec::new(),
            debug_trace: None,
        }
    }

    /// Fold a stage's fallback marker into the plan.
    pub fn note_fallback(&mut self, stage: &str, fallback: &FallbackInfo) {
        if !fallback.is_fallback() {
            return;
        }
        self.fallback_mode = true;
        let error = fallback.error.as_deref().unwrap_or("unknown error");
        self.errors.push(format!("{stage}: {error}"));
    }

    pub fn day(&self, day_number: u32) -> Option<&ItineraryDay> {
        self.itinerary.iter().find(|day| day.day_number == day_number)
    }

    pub fn total_activities(&self) -> usize {
        self.itinerary.iter().map(|day| day.activities.len()).sum()
    }
}

/// A run that could not produce a plan.
#[derive(Debug, Error)]
#[error("plan {plan_id} failed: {error}")]
pub struct PlanFailure {
    pub plan_id: String,
    #[source]
    pub error: PlannerError,
    pub debug_trace: Option<ExecutionTrace>,
}

impl PlanFailure {
    pub fn new(plan_id: impl Into<String>, error: PlannerError) -> Self {
        Self {
            plan_id: plan_id.into(),
            error,
            debug_trace: None,
        }
    }

    /// Error body in the same envelope as a plan: `status: "error"` plus details.
    pub fn to_payload(&self) -> Value {
        let mut payload = self.error.to_error_payload();
        payload["status"] = json!("error");
        payload["plan_id"] = json!(self.plan_id);
        if let Some(trace) = &self.debug_trace {
            payload["debug_trace"] = serde_json::to_value(trace).unwrap_or(Value::Null);
        }
        payload
    }
}

pub type PlanResult = Result<Plan, PlanFailure>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::constraints::{BudgetCategory, Constraints};

    fn parsed() -> ParsedConstraints {
        ParsedConstraints {
            constraints: Constraints::default(),
            duration: 3,
            budget_category: BudgetCategory::Moderate,
            daily_budget: 150.0,
            warnings: vec!["Trip is short".to_string()],
            assumptions: vec!["Assuming moderate pace".to_string()],
            conflicts: Vec::new(),
        }
    }

    #[test]
    fn test_detail_level_round_trips_through_str() {
        let level: DetailLevel = "high_level".parse().unwrap();
        assert_eq!(level, DetailLevel::HighLevel);
        assert_eq!(level.as_str(), "high_level");
        assert!("deep".parse::<DetailLevel>().is_err());
    }

    #[test]
    fn test_new_plan_carries_normalizer_notes() {
        let plan = Plan::new("abcd1234", DetailLevel::Medium, TravelRequest::default(), parsed());
        assert_eq!(plan.warnings, vec!["Trip is short".to_string()]);
        assert_eq!(plan.assumptions, vec!["Assuming moderate pace".to_string()]);

        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["level"], "medium");
        assert!(value.get("destination").is_none());
    }

    #[test]
    fn test_note_fallback_marks_plan() {
        let mut plan = Plan::new("abcd1234", DetailLevel::Full, TravelRequest::default(), parsed());
        plan.note_fallback("itinerary_planning", &FallbackInfo::default());
        assert!(!plan.fallback_mode);

        let failure = PlannerError::Format("no JSON object found".to_string());
        plan.note_fallback("itinerary_planning", &FallbackInfo::from_error(&failure));
        assert!(plan.fallback_mode);
        assert_eq!(plan.errors.len(), 1);
        assert!(plan.errors[0].starts_with("itinerary_planning: Format error"));
    }

    #[test]
    fn test_conflict_failure_payload() {
        let failure = PlanFailure::new(
            "abcd1234",
            PlannerError::Conflict(vec!["Invalid date range".to_string()]),
        );
        let payload = failure.to_payload();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error"]["code"], "CONSTRAINT_CONFLICT");
        assert_eq!(payload["conflicts"][0], "Invalid date range");
    }
}
