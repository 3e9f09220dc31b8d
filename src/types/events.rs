use serde::{Deserialize, Serialize};

use crate::types::{
    itinerary::{Activity, ItineraryDay},
    transport::{TransportLeg, TransportOptions},
    FallbackInfo,
};

/// An activity after per-activity enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedActivity {
    #[serde(flatten)]
    pub activity: Activity,
    #[serde(flatten)]
    pub fallback: FallbackInfo,
}

/// Payload of an `activity_enriched` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnrichedUnit {
    Transport(TransportOptions),
    Activity(EnrichedActivity),
}

/// One message of the progressive enrichment stream.
///
/// `day` and `activity` are zero-based positions in the itinerary. The
/// outbound leg reports both as -1; the return leg reports `day` as the
/// itinerary length.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentEvent {
    Starting {
        total_activities: usize,
    },
    ActivityEnriched {
        day: i64,
        activity: i64,
        data: EnrichedUnit,
        count: usize,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<TransportLeg>,
    },
    DayComplete {
        day: usize,
    },
    Complete {
        itinerary: Vec<ItineraryDay>,
    },
    Error {
        error: String,
    },
}

impl EnrichmentEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnrichmentEvent::Complete { .. } | EnrichmentEvent::Error { .. }
        )
    }

    /// Name of the `status` discriminator.
    pub fn status(&self) -> &'static str {
        match self {
            EnrichmentEvent::Starting { .. } => "starting",
            EnrichmentEvent::ActivityEnriched { .. } => "activity_enriched",
            EnrichmentEvent::DayComplete { .. } => "day_complete",
            EnrichmentEvent::Complete { .. } => "complete",
            EnrichmentEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_event_encoding() {
        let event = EnrichmentEvent::ActivityEnriched {
            day: -1,
            activity: -1,
            data: EnrichedUnit::Transport(TransportOptions::default().for_leg(
                TransportLeg::TransportTo,
                "Pittsburgh",
                "Lisbon",
            )),
            count: 1,
            kind: Some(TransportLeg::TransportTo),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["status"], "activity_enriched");
        assert_eq!(value["day"], -1);
        assert_eq!(value["type"], "transport_to");
        assert_eq!(value["data"]["type"], "transportation");
        assert_eq!(value["data"]["is_outbound"], true);
        assert_eq!(value["data"]["name"], "Transportation: Pittsburgh to Lisbon");
    }

    #[test]
    fn test_activity_event_has_no_type_tag() {
        let event = EnrichmentEvent::ActivityEnriched {
            day: 0,
            activity: 1,
            data: EnrichedUnit::Activity(EnrichedActivity {
                activity: Activity::new("Lunch", "1 hour", "dining", "medium"),
                fallback: FallbackInfo::default(),
            }),
            count: 2,
            kind: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("type").is_none());
        assert_eq!(value["data"]["name"], "Lunch");
        assert_eq!(value["data"]["type"], "dining");
        assert!(value["data"].get("fallback_mode").is_none());
        assert!(!event.is_terminal());
        assert_eq!(event.status(), "activity_enriched");
    }
}
