pub mod constraints;
pub mod destination;
pub mod events;
pub mod itinerary;
pub mod plan;
pub mod trace;
pub mod transport;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

pub use constraints::{
    BudgetCategory, Constraints, Pace, ParsedConstraints, PlanAction, TravelRequest,
    DEFAULT_TRIP_DAYS,
};
pub use destination::{Destination, DestinationBatch};
pub use events::{EnrichedActivity, EnrichedUnit, EnrichmentEvent};
pub use itinerary::{
    Activity, ActivityDetails, BudgetBreakdown, DurationEstimate, DurationUnit, HotelOption,
    ItineraryDay, ItineraryDraft, PageDetails, RestaurantOption,
};
pub use plan::{DetailLevel, EnrichmentLevel, Plan, PlanFailure, PlanResult, PlanStatus};
pub use trace::{ExecutionTrace, StepOutcome, StepTimer, TraceStep};
pub use transport::{TransportLeg, TransportOption, TransportOptions};

/// Marker carried by every stage output that was produced by a fallback.
///
/// Serialized flat into the owning object as `fallback_mode` and `error`,
/// both omitted for model-generated output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackInfo {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FallbackInfo {
    pub fn from_error(error: &PlannerError) -> Self {
        Self {
            fallback_mode: true,
            error: Some(error.to_string()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_mode
    }
}
