use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    services::TextGenerator,
    stages::{ActivityEnricher, TransportRequest},
    types::{EnrichedUnit, EnrichmentEvent, Plan, TransportLeg},
};

/// Events buffered ahead of a slow consumer.
pub const STREAM_BUFFER: usize = 32;

/// False once the consumer has gone away.
async fn emit(events: &mpsc::Sender<EnrichmentEvent>, event: EnrichmentEvent) -> bool {
    events.send(event).await.is_ok()
}

/// Enrich a stored plan unit by unit, reporting each as it completes.
///
/// Order: outbound leg, every activity day by day, return leg, then one
/// `complete` event carrying the assembled itinerary. Legs are only
/// produced when the plan has a departure city and at least one day.
pub async fn enrich_progressively(
    generator: &dyn TextGenerator,
    enricher: &ActivityEnricher,
    plan: &Plan,
    events: &mpsc::Sender<EnrichmentEvent>,
) {
    let destination = plan.destination.as_ref();
    let name = destination.map_or("destination", |destination| destination.name.as_str());
    let country = destination.map_or("", |destination| destination.country.as_str());
    let departure = plan.parsed_constraints.constraints.departure();
    let itinerary = &plan.itinerary;

    let mut total_activities = plan.total_activities();
    if departure.is_some() {
        total_activities += 2;
    }
    info!(plan_id = %plan.plan_id, total_activities, "starting progressive enrichment");
    if !emit(events, EnrichmentEvent::Starting { total_activities }).await {
        return;
    }

    let home = departure.filter(|_| !itinerary.is_empty());
    let mut count = 0;

    if let Some(home) = home {
        count += 1;
        let request = TransportRequest::new(home, name, country, TransportLeg::TransportTo);
        let options = enricher.enrich_transportation(generator, &request).await;
        let event = EnrichmentEvent::ActivityEnriched {
            day: -1,
            activity: -1,
            data: EnrichedUnit::Transport(options),
            count,
            kind: Some(TransportLeg::TransportTo),
        };
        if !emit(events, event).await {
            debug!(plan_id = %plan.plan_id, "consumer left during outbound leg");
            return;
        }
    }

    let mut enriched_itinerary = Vec::with_capacity(itinerary.len());
    for (day_idx, day) in itinerary.iter().enumerate() {
        let mut enriched_day = day.clone();
        let mut activities = Vec::with_capacity(day.activities.len());

        for (activity_idx, activity) in day.activities.iter().enumerate() {
            count += 1;
            let enriched = enricher
                .enrich_activity(generator, activity, name, day.day_number)
                .await;
            activities.push(enriched.activity.clone());

            let event = EnrichmentEvent::ActivityEnriched {
                day: day_idx as i64,
                activity: activity_idx as i64,
                data: EnrichedUnit::Activity(enriched),
                count,
                kind: None,
            };
            if !emit(events, event).await {
                debug!(plan_id = %plan.plan_id, count, "consumer left mid-stream");
                return;
            }
        }

        enriched_day.activities = activities;
        enriched_day.refresh_metrics();
        enriched_itinerary.push(enriched_day);

        if !emit(events, EnrichmentEvent::DayComplete { day: day_idx }).await {
            return;
        }
    }

    if let Some(home) = home {
        count += 1;
        let request = TransportRequest::new(home, name, country, TransportLeg::TransportBack);
        let options = enricher.enrich_transportation(generator, &request).await;
        let event = EnrichmentEvent::ActivityEnriched {
            day: itinerary.len() as i64,
            activity: -1,
            data: EnrichedUnit::Transport(options),
            count,
            kind: Some(TransportLeg::TransportBack),
        };
        if !emit(events, event).await {
            return;
        }
    }

    info!(plan_id = %plan.plan_id, count, "progressive enrichment complete");
    emit(
        events,
        EnrichmentEvent::Complete {
            itinerary: enriched_itinerary,
        },
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generation::testing::ScriptedGenerator;
    use crate::stages::normalize;
    use crate::types::{Activity, Constraints, Destination, DetailLevel, ItineraryDay, TravelRequest};

    fn plan(departure: Option<&str>) -> Plan {
        let constraints = Constraints {
            departure_city: departure.map(str::to_string),
            ..Constraints::default()
        };
        let parsed = normalize(&constraints);
        let mut plan = Plan::new("s1", DetailLevel::Medium, TravelRequest::new(constraints), parsed);
        plan.destination = Some(Destination::user_selected("Porto, Portugal", 120.0, String::new()));
        plan.itinerary = vec![ItineraryDay {
            day_number: 1,
            activities: vec![
                Activity::new("Ribeira walk", "2 hours", "sightseeing", "high"),
                Activity::new("Port tasting", "1 hour", "dining", "medium"),
            ],
            ..ItineraryDay::default()
        }];
        plan
    }

    async fn collect(plan: &Plan) -> Vec<EnrichmentEvent> {
        let generator = ScriptedGenerator::failing();
        let enricher = ActivityEnricher::new();
        let (events, mut receiver) = mpsc::channel(STREAM_BUFFER);
        enrich_progressively(&generator, &enricher, plan, &events).await;
        drop(events);

        let mut collected = Vec::new();
        while let Some(event) = receiver.recv().await {
            collected.push(event);
        }
        collected
    }

    #[tokio::test]
    async fn test_no_departure_means_no_legs() {
        let events = collect(&plan(None)).await;
        let statuses: Vec<&str> = events.iter().map(EnrichmentEvent::status).collect();

        assert_eq!(
            statuses,
            vec!["starting", "activity_enriched", "activity_enriched", "day_complete", "complete"]
        );
        assert_eq!(events[0], EnrichmentEvent::Starting { total_activities: 2 });
    }

    #[tokio::test]
    async fn test_complete_carries_enriched_days() {
        let events = collect(&plan(Some("Madrid"))).await;
        let Some(EnrichmentEvent::Complete { itinerary }) = events.last() else {
            panic!("stream did not complete");
        };

        assert_eq!(itinerary.len(), 1);
        assert_eq!(itinerary[0].activities[0].name, "Ribeira walk");
        assert_eq!(itinerary[0].activities[0].details.cost_estimate, Some(20.0));
        assert_eq!(itinerary[0].activity_count, 2);
    }

    #[tokio::test]
    async fn test_dropped_consumer_stops_producer() {
        let generator = ScriptedGenerator::failing();
        let enricher = ActivityEnricher::new();
        let (events, receiver) = mpsc::channel(1);
        drop(receiver);

        enrich_progressively(&generator, &enricher, &plan(Some("Madrid")), &events).await;

        assert_eq!(generator.call_count(), 0);
    }
}
