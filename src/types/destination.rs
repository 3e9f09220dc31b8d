use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::completion_schema;
use crate::types::FallbackInfo;

/// A candidate destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Destination {
    /// Specific destination name, e.g. "Lisbon"
    pub name: String,
    /// Country the destination is in
    #[serde(default)]
    pub country: String,
    /// Suitability for this traveler, 0-100; only comparable within one batch
    #[serde(default)]
    pub score: f64,
    /// Two or three sentences on why it matches the traveler's style and interests
    #[serde(default)]
    pub reasoning: String,
    /// Top attractions or experiences that align with the interests
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Realistic daily cost in USD
    #[serde(default)]
    pub estimated_daily_cost: f64,
    /// What the destination excels at
    #[serde(default)]
    pub best_for: String,
    /// Weather, visa, safety and travel-distance notes
    #[serde(default)]
    pub considerations: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub budget_warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub budget_note: Option<String>,
}

impl Destination {
    /// Build from a caller-chosen `"City, Country"` string without consulting a model.
    pub fn user_selected(selection: &str, estimated_daily_cost: f64, reasoning: String) -> Self {
        let mut parts = selection.split(',');
        let name = parts.next().unwrap_or(selection).trim().to_string();
        let country = parts
            .next()
            .map(str::trim)
            .filter(|country| !country.is_empty())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            name,
            country,
            score: 100.0,
            reasoning,
            estimated_daily_cost,
            best_for: "User's choice".to_string(),
            ..Self::default()
        }
    }
}

/// One recommendation batch, ranked by score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct DestinationBatch {
    /// Diverse destinations matching the traveler, best first
    pub destinations: Vec<Destination>,
    /// Brief explanation of the recommendation approach
    #[serde(default)]
    pub reasoning_summary: String,
    #[serde(flatten)]
    #[schemars(skip)]
    pub fallback: FallbackInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_selected_splits_city_and_country() {
        let destination = Destination::user_selected(
            "Marrakech, Morocco",
            120.0,
            "Selected by user".to_string(),
        );
        assert_eq!(destination.name, "Marrakech");
        assert_eq!(destination.country, "Morocco");
        assert_eq!(destination.score, 100.0);
        assert_eq!(destination.estimated_daily_cost, 120.0);
    }

    #[test]
    fn test_user_selected_without_country() {
        let destination = Destination::user_selected("Reykjavik", 0.0, String::new());
        assert_eq!(destination.name, "Reykjavik");
        assert_eq!(destination.country, "Unknown");
    }
}
