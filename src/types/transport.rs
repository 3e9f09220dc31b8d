use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::completion_schema;
use crate::types::FallbackInfo;

/// Direction of a transportation leg relative to the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportLeg {
    /// Departure city to destination.
    TransportTo,
    /// Destination back to the departure city.
    TransportBack,
}

impl TransportLeg {
    pub fn is_outbound(&self) -> bool {
        matches!(self, TransportLeg::TransportTo)
    }
}

/// One way of making the journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TransportOption {
    /// Flight, Train, Bus or Car
    pub mode: String,
    /// Route and connection details
    #[serde(default)]
    pub details: String,
    /// Door-to-door travel time
    #[serde(default)]
    pub duration: String,
    /// e.g. "$150-300"
    #[serde(default)]
    pub cost_range: String,
    /// Airlines or operators serving the route
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_url: Option<String>,
}

/// Multi-mode options for getting to or from the destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct TransportOptions {
    /// Short label, e.g. "Transportation: Pittsburgh to Lisbon"
    #[serde(default)]
    pub name: String,
    /// Overview of the available options
    #[serde(default)]
    pub description: String,
    /// Options ordered from most to least practical
    pub options: Vec<TransportOption>,
    /// Which mode to pick and why
    #[serde(default)]
    pub recommended_option: String,
    #[serde(default)]
    pub tips: Vec<String>,
    /// Booking or route information URLs
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, rename = "type")]
    #[schemars(skip)]
    pub kind: String,
    #[serde(default)]
    #[schemars(skip)]
    pub is_transportation: bool,
    #[serde(default)]
    #[schemars(skip)]
    pub is_outbound: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub fallback: FallbackInfo,
}

impl TransportOptions {
    /// Stamp the fields the model is not asked for.
    pub fn for_leg(mut self, leg: TransportLeg, origin: &str, destination: &str) -> Self {
        if self.name.trim().is_empty() {
            self.name = format!("Transportation: {origin} to {destination}");
        }
        self.kind = "transportation".to_string();
        self.is_transportation = true;
        self.is_outbound = leg.is_outbound();
        self
    }
}
