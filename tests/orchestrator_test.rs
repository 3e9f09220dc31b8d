use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tripweaver::{
    services::{generation::testing::ScriptedGenerator, LinkProbe},
    stages::ActivityEnricher,
    types::{BudgetCategory, EnrichmentLevel, Pace, TransportLeg},
    Constraints, DetailLevel, EnrichmentEvent, Orchestrator, PlanAction, SourceValidator,
    TravelRequest,
};

const RECOMMENDER: &str = "destination recommendation agent";
const PLANNER: &str = "itinerary planning agent";
const DETAILER: &str = "detail enrichment agent";

struct AllowAll;

#[async_trait]
impl LinkProbe for AllowAll {
    async fn is_reachable(&self, _url: &str) -> bool {
        true
    }
}

fn orchestrator(generator: &Arc<ScriptedGenerator>) -> Orchestrator {
    Orchestrator::new(generator.clone())
        .with_activity_enricher(ActivityEnricher::new().with_page_fetch(false))
        .with_validator(SourceValidator::new(Arc::new(AllowAll)))
}

fn request(dates: &str, budget: f64) -> TravelRequest {
    TravelRequest::new(Constraints {
        dates: Some(dates.to_string()),
        budget: Some(budget),
        interests: vec!["food".to_string(), "history".to_string()],
        ..Constraints::default()
    })
}

fn activity(name: &str, kind: &str, priority: &str) -> Value {
    json!({"name": name, "duration": "2 hours", "type": kind, "priority": priority})
}

/// Three days carrying 2, 3 and 1 activities.
fn three_day_itinerary() -> String {
    json!({
        "itinerary": [
            {
                "day_number": 1,
                "title": "Medina arrival",
                "theme": "Orientation",
                "activities": [
                    activity("Jemaa el-Fnaa", "sightseeing", "high"),
                    activity("Riad dinner", "dining", "medium")
                ]
            },
            {
                "day_number": 2,
                "title": "Gardens and palaces",
                "theme": "Culture",
                "activities": [
                    activity("Majorelle Garden", "sightseeing", "high"),
                    activity("Bahia Palace", "cultural", "medium"),
                    activity("Hammam", "relaxation", "low")
                ]
            },
            {
                "day_number": 3,
                "title": "Departure",
                "theme": "Souks",
                "activities": [activity("Souk shopping", "shopping", "low")]
            }
        ],
        "overview": "Three days in the Red City",
        "pacing_notes": "Slow mornings"
    })
    .to_string()
}

fn marrakech_request() -> TravelRequest {
    TravelRequest::new(Constraints {
        dates: Some("2024-10-01 to 2024-10-03".to_string()),
        budget: Some(900.0),
        departure_city: Some("Pittsburgh".to_string()),
        ..Constraints::default()
    })
    .with_destination("Marrakech, Morocco")
}

#[tokio::test]
async fn test_budget_banding_follows_daily_budget() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-05", 500.0), DetailLevel::HighLevel, false)
        .await
        .unwrap();
    assert_eq!(plan.parsed_constraints.duration, 5);
    assert_eq!(plan.parsed_constraints.daily_budget, 100.0);
    assert_eq!(plan.parsed_constraints.budget_category, BudgetCategory::Moderate);

    let mut frugal = request("2024-07-01 to 2024-07-03", 500.0);
    frugal.constraints.travel_style = Some("budget".to_string());
    let plan = planner
        .generate_plan(frugal, DetailLevel::HighLevel, false)
        .await
        .unwrap();
    assert_eq!(plan.parsed_constraints.duration, 3);
    assert!((plan.parsed_constraints.daily_budget - 166.67).abs() < 0.01);
    assert_eq!(plan.parsed_constraints.budget_category, BudgetCategory::Moderate);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-10", 450.0), DetailLevel::HighLevel, false)
        .await
        .unwrap();
    assert_eq!(plan.parsed_constraints.budget_category, BudgetCategory::Budget);
    assert!(plan
        .warnings
        .iter()
        .any(|warning| warning.starts_with("Budget is very tight")));
    assert_eq!(plan.destinations[0].name, "Mexico City");
}

#[tokio::test]
async fn test_selected_destination_skips_recommender() {
    let generator =
        Arc::new(ScriptedGenerator::new().respond_when(PLANNER, three_day_itinerary()));
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(marrakech_request(), DetailLevel::Medium, false)
        .await
        .unwrap();

    assert_eq!(generator.calls_mentioning(RECOMMENDER), 0);
    assert_eq!(generator.calls_mentioning(PLANNER), 1);

    let destination = plan.destination.as_ref().unwrap();
    assert_eq!(destination.name, "Marrakech");
    assert_eq!(destination.country, "Morocco");
    assert_eq!(destination.score, 100.0);
    assert_eq!(destination.reasoning, "Selected by user: Marrakech, Morocco");
    assert_eq!(plan.itinerary.len(), 3);
    assert_eq!(plan.itinerary[1].activity_count, 3);
    assert!(!plan.fallback_mode);
    assert!(plan.enrichment_level.is_none());
}

#[tokio::test]
async fn test_conflict_aborts_before_any_generation() {
    let generator = Arc::new(ScriptedGenerator::new());
    let planner = orchestrator(&generator);

    let mut luxury = request("2024-07-01 to 2024-07-05", 100.0);
    luxury.constraints.travel_style = Some("luxury".to_string());

    let failure = planner
        .generate_plan(luxury, DetailLevel::Full, false)
        .await
        .unwrap_err();

    assert_eq!(generator.call_count(), 0);
    assert_eq!(failure.error.error_code(), "CONSTRAINT_CONFLICT");
    assert_eq!(failure.to_payload()["status"], "error");
    assert!(planner.get_plan(&failure.plan_id).await.is_none());

    let reversed = request("2024-07-05 to 2024-07-01", 1000.0);
    let failure = planner
        .generate_plan(reversed, DetailLevel::Medium, false)
        .await
        .unwrap_err();
    assert!(failure.error.to_string().contains("Invalid date range"));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_outage_still_yields_complete_plan() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-03", 900.0), DetailLevel::Full, false)
        .await
        .unwrap();

    assert!(plan.fallback_mode);
    assert!(!plan.errors.is_empty());
    assert_eq!(plan.enrichment_level, Some(EnrichmentLevel::Basic));
    assert_eq!(plan.destination.as_ref().unwrap().name, "Barcelona");
    assert_eq!(plan.itinerary.len(), 3);
    for day in &plan.itinerary {
        assert!(!day.activities.is_empty());
        for activity in &day.activities {
            assert!(activity.details.time_slot.is_some());
            assert!(activity.details.cost_estimate.is_some());
        }
    }
    assert_eq!(planner.get_plan(&plan.plan_id).await.unwrap(), plan);
}

#[tokio::test]
async fn test_enrichment_keeps_planned_fields() {
    let enrichment = json!({
        "activities": [
            {"description": "The main square at dusk", "time_slot": "6:00 PM - 8:00 PM", "cost_estimate": 0},
            {"description": "Tagine in a courtyard", "cost_estimate": 35}
        ],
        "budget_breakdown": {"meals": 50, "total": 120}
    })
    .to_string();
    let generator = Arc::new(
        ScriptedGenerator::new()
            .respond_when(PLANNER, three_day_itinerary())
            .respond_when(DETAILER, enrichment),
    );
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(marrakech_request(), DetailLevel::Full, false)
        .await
        .unwrap();

    assert_eq!(plan.enrichment_level, Some(EnrichmentLevel::Detailed));
    let first = &plan.itinerary[0].activities;
    assert_eq!(first[0].name, "Jemaa el-Fnaa");
    assert_eq!(first[0].kind, "sightseeing");
    assert_eq!(first[0].priority, "high");
    assert_eq!(first[0].details.description.as_deref(), Some("The main square at dusk"));
    assert_eq!(first[1].name, "Riad dinner");
    assert_eq!(first[1].details.cost_estimate, Some(35.0));

    let second = &plan.itinerary[1].activities;
    assert_eq!(second[2].name, "Hammam");
    assert_eq!(second[2].kind, "relaxation");
    assert_eq!(second[2].priority, "low");
}

#[tokio::test]
async fn test_refine_overrides_and_keeps_level() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let original = planner
        .generate_plan(request("2024-07-01 to 2024-07-05", 300.0), DetailLevel::Medium, false)
        .await
        .unwrap();
    assert_eq!(original.parsed_constraints.budget_category, BudgetCategory::Budget);

    let overrides: Map<String, Value> = json!({"budget": 2000}).as_object().unwrap().clone();
    let refined = planner
        .refine_plan(&original.plan_id, &overrides, false)
        .await
        .unwrap();

    assert_ne!(refined.plan_id, original.plan_id);
    assert_eq!(refined.level, DetailLevel::Medium);
    assert_eq!(refined.request.constraints.budget, Some(2000.0));
    assert_eq!(refined.request.constraints.interests, original.request.constraints.interests);
    assert_eq!(refined.parsed_constraints.budget_category, BudgetCategory::Comfortable);

    let again = planner
        .refine_plan(&original.plan_id, &overrides, false)
        .await
        .unwrap();
    assert_eq!(again.request, refined.request);
    assert_eq!(again.destination, refined.destination);

    assert_eq!(original.request.constraints.pace, None);
    assert_eq!(refined.request.constraints.pace, Some(Pace::Moderate));
    assert!(original
        .parsed_constraints
        .assumptions
        .contains(&"Assuming moderate pace".to_string()));
    assert!(refined.parsed_constraints.assumptions.is_empty());

    let failure = planner
        .refine_plan("missing1", &Map::new(), false)
        .await
        .unwrap_err();
    assert_eq!(failure.error.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_alternatives_exclude_current_destination() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-05", 1000.0), DetailLevel::Medium, false)
        .await
        .unwrap();
    let current = plan.destination.as_ref().unwrap().name.clone();

    let alternatives = planner.get_alternatives(&plan.plan_id, 3, false).await.unwrap();
    assert!(alternatives.debug_trace.is_none());
    assert_eq!(alternatives.current_destination, current);
    assert!(!alternatives.alternatives.is_empty());
    assert!(alternatives
        .alternatives
        .iter()
        .all(|destination| destination.name != current));

    assert!(planner.get_alternatives("nope", 3, false).await.is_err());
}

#[tokio::test]
async fn test_alternatives_trace_the_recommender_when_debugging() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-05", 1000.0), DetailLevel::Medium, true)
        .await
        .unwrap();

    let alternatives = planner.get_alternatives(&plan.plan_id, 2, true).await.unwrap();
    let trace = alternatives.debug_trace.as_ref().unwrap();
    assert_eq!(trace.plan_id, plan.plan_id);
    assert_eq!(trace.detail_level, "medium");
    assert_eq!(trace.step_names(), vec!["destination_recommendation"]);

    let stored = planner.get_trace(&plan.plan_id).await.unwrap();
    assert_eq!(Some(&stored), plan.debug_trace.as_ref());
}

#[tokio::test]
async fn test_high_level_ranks_candidates() {
    let batch = json!({
        "destinations": [
            {"name": "Porto", "country": "Portugal", "score": 78, "estimated_daily_cost": 110},
            {"name": "Seville", "country": "Spain", "score": 91, "estimated_daily_cost": 260},
            {"name": "Valletta", "country": "Malta", "score": 84, "estimated_daily_cost": 180}
        ],
        "reasoning_summary": "Warm, walkable cities"
    })
    .to_string();
    let generator = Arc::new(ScriptedGenerator::new().respond_when(RECOMMENDER, batch));
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-05", 750.0), DetailLevel::HighLevel, false)
        .await
        .unwrap();

    let prompt = &generator.requests()[0].user_prompt;
    assert!(prompt.contains("Recommend 5 HIGHLY CONTEXTUAL"));

    let names: Vec<&str> = plan.destinations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Seville", "Valletta", "Porto"]);
    assert!(plan.destinations[0].budget_warning.is_some());
    assert!(plan.destinations[1].budget_note.is_some());
    assert_eq!(plan.reasoning.as_deref(), Some("Warm, walkable cities"));
    assert!(plan.itinerary.is_empty());
}

#[tokio::test]
async fn test_progressive_stream_with_departure_city() {
    let generator =
        Arc::new(ScriptedGenerator::new().respond_when(PLANNER, three_day_itinerary()));
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(marrakech_request(), DetailLevel::Medium, false)
        .await
        .unwrap();

    let mut receiver = planner.stream_enrichment(&plan.plan_id).await;
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }

    assert_eq!(events[0], EnrichmentEvent::Starting { total_activities: 8 });
    let enriched: Vec<&EnrichmentEvent> = events
        .iter()
        .filter(|event| event.status() == "activity_enriched")
        .collect();
    assert_eq!(enriched.len(), 8);
    let day_completions = events
        .iter()
        .filter(|event| event.status() == "day_complete")
        .count();
    assert_eq!(day_completions, 3);

    let EnrichmentEvent::ActivityEnriched { day, activity, kind, count, .. } = enriched[0] else {
        panic!("expected an enrichment event");
    };
    assert_eq!((*day, *activity, *count), (-1, -1, 1));
    assert_eq!(*kind, Some(TransportLeg::TransportTo));

    let EnrichmentEvent::ActivityEnriched { day, kind, count, .. } = enriched[7] else {
        panic!("expected an enrichment event");
    };
    assert_eq!((*day, *count), (3, 8));
    assert_eq!(*kind, Some(TransportLeg::TransportBack));

    let Some(EnrichmentEvent::Complete { itinerary }) = events.last() else {
        panic!("stream did not complete");
    };
    assert_eq!(itinerary.len(), 3);
    assert_eq!(itinerary[1].activities[1].name, "Bahia Palace");
    assert!(events.iter().filter(|event| event.is_terminal()).count() == 1);
}

#[tokio::test]
async fn test_stream_for_unknown_plan_reports_error() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let mut receiver = planner.stream_enrichment("ghost").await;
    let first = receiver.recv().await.unwrap();
    assert_eq!(
        first,
        EnrichmentEvent::Error {
            error: "Plan not found".to_string()
        }
    );
    assert!(receiver.recv().await.is_none());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_debug_mode_stores_trace() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-02", 600.0), DetailLevel::Full, true)
        .await
        .unwrap();

    let trace = planner.get_trace(&plan.plan_id).await.unwrap();
    assert_eq!(
        trace.step_names(),
        vec![
            "constraint_parsing",
            "destination_recommendation",
            "itinerary_planning",
            "detail_enrichment"
        ]
    );
    assert_eq!(trace.detail_level, "full");
    assert_eq!(plan.debug_trace.as_ref(), Some(&trace));

    let quiet = planner
        .generate_plan(request("2024-07-01 to 2024-07-02", 600.0), DetailLevel::Medium, false)
        .await
        .unwrap();
    assert!(planner.get_trace(&quiet.plan_id).await.is_none());
    assert!(quiet.debug_trace.is_none());
}

#[tokio::test]
async fn test_existing_plan_takes_enhancement_path() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let request = TravelRequest::new(Constraints::default())
        .with_destination("Lisbon, Portugal")
        .with_existing_plan(
            "Day 1: arrive and walk Alfama\nCastle at sunset\nDay 2: Sintra\nPena Palace",
            PlanAction::FillGaps,
        );

    let plan = planner
        .generate_plan(request, DetailLevel::Full, true)
        .await
        .unwrap();

    assert_eq!(plan.level, DetailLevel::Enhanced);
    assert_eq!(plan.action_performed, Some(PlanAction::FillGaps));
    assert!(plan.fallback_mode);
    assert_eq!(plan.itinerary.len(), 2);
    assert_eq!(plan.itinerary[1].activities[0].name, "Pena Palace");
    assert_eq!(plan.destination.as_ref().unwrap().best_for, "User's plan");
    assert_eq!(
        plan.enhancements_summary.as_deref(),
        Some("Applied fill_gaps to your travel plan")
    );

    let trace = plan.debug_trace.as_ref().unwrap();
    assert_eq!(
        trace.step_names(),
        vec!["constraint_parsing", "plan_enhancement", "source_validation"]
    );
}

#[tokio::test]
async fn test_enhanced_level_without_plan_is_rejected() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let failure = planner
        .generate_plan(request("2024-07-01 to 2024-07-02", 600.0), DetailLevel::Enhanced, false)
        .await
        .unwrap_err();
    assert_eq!(failure.error.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_regenerate_day_acknowledges_stored_plans() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let planner = orchestrator(&generator);

    let plan = planner
        .generate_plan(request("2024-07-01 to 2024-07-03", 600.0), DetailLevel::Medium, false)
        .await
        .unwrap();

    let ack = planner
        .regenerate_day(&plan.plan_id, 2, Some(&json!({"pace": "relaxed"})))
        .await
        .unwrap();
    assert_eq!(ack.day_number, 2);
    assert_eq!(planner.get_plan(&plan.plan_id).await.unwrap(), plan);

    assert!(ack.message.contains(&plan.itinerary[1].title));

    let err = planner.regenerate_day("nope", 1, None).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    let err = planner.regenerate_day(&plan.plan_id, 9, None).await.unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
    assert!(planner.list_plans().await.contains(&plan.plan_id));
}
