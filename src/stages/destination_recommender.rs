use tracing::info;

use crate::{
    error::{PlannerError, Result},
    stages::PromptedStage,
    types::{
        constraints::non_empty, BudgetCategory, Destination, DestinationBatch, FallbackInfo,
        ParsedConstraints,
    },
};

pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;
const FALLBACK_LIMIT: usize = 3;

const SYSTEM_PROMPT: &str = "You are a destination recommendation agent for a travel planning system.
Suggest DIVERSE and VARIED destinations based specifically on the traveler's stated preferences.

- Never default to the same popular places; span different regions and countries.
- Match travel style and interests first, then budget, season and distance from the departure city.
- If they want adventure and hiking, suggest mountain and nature destinations; cultural travel means historically rich cities; relaxation means beaches and resorts; budget travel means affordable countries.
- Scores (0-100) express how well each destination matches this traveler.
- estimated_daily_cost is a realistic per-day cost in USD.";

/// Season bucket for the month of the trip start.
pub fn season_for(dates: &str) -> Option<&'static str> {
    let month: u32 = dates.split('-').nth(1)?.trim().parse().ok()?;
    Some(match month {
        12 | 1 | 2 => "WINTER (Dec-Feb)",
        3..=5 => "SPRING (Mar-May)",
        6..=8 => "SUMMER (Jun-Aug)",
        9..=11 => "FALL (Sep-Nov)",
        _ => return None,
    })
}

fn proximity_block(departure: &str, duration: i64) -> String {
    if duration <= 3 {
        format!(
            "- Departure City: {departure}
- Trip Duration: SHORT ({duration} days)
- CRITICAL: Recommend ONLY nearby destinations within 2-3 hours
- Focus on: Minimal travel time, maximize destination time
- Avoid: Long-haul flights that waste precious vacation days
"
        )
    } else if duration <= 7 {
        format!(
            "- Departure City: {departure}
- Trip Duration: MEDIUM ({duration} days)
- Recommend: Mix of nearby and regional destinations
- Consider: 1-4 hour flights acceptable, but factor in airport time
- Preference: Direct flights when possible
"
        )
    } else {
        format!(
            "- Departure City: {departure}
- Trip Duration: LONG ({duration}+ days)
- Recommend: Mix of nearby and international destinations
- Can include: Long-haul flights (Europe, Asia, etc.) as there's time
"
        )
    }
}

fn travel_range_block(range: &str) -> Option<&'static str> {
    match range.to_ascii_lowercase().as_str() {
        "local" => Some(
            "- Travel Range: LOCAL (Same Region)
- Recommend ONLY: Driveable destinations, same state/province, within 2-3 hours
- NO flights required - road trip friendly
",
        ),
        "domestic" => Some(
            "- Travel Range: DOMESTIC
- Recommend ONLY: Destinations within the same country
- NO international travel - no passport needed
",
        ),
        "regional" => Some(
            "- Travel Range: REGIONAL (Nearby Countries)
- Recommend: Neighboring countries, short flights only
",
        ),
        "international" => Some(
            "- Travel Range: INTERNATIONAL
- Open to: Any destination worldwide
- Include: Long-haul flights, multiple time zones, diverse cultures
",
        ),
        _ => None,
    }
}

fn style_block(style: &str) -> Option<&'static str> {
    match style.to_ascii_lowercase().as_str() {
        "relaxation" => Some(
            "- Travel Style: RELAXATION
- Recommend: Beach resorts, spa destinations, peaceful retreats, island getaways
- Focus on: Calm atmospheres, wellness, beaches, nature
",
        ),
        "luxury" => Some(
            "- Travel Style: LUXURY
- Recommend: 5-star resorts, exclusive destinations, high-end experiences
- Focus on: Michelin restaurants, luxury hotels, exclusive experiences, high-end shopping
",
        ),
        "adventure" => Some(
            "- Travel Style: ADVENTURE
- Recommend: Mountain destinations, national parks, adventure hubs
- Focus on: Hiking, climbing, water sports, extreme activities
",
        ),
        "budget" => Some(
            "- Travel Style: BUDGET
- Recommend: Affordable destinations with great value
- Focus on: Low cost of living, free attractions, budget accommodations
",
        ),
        _ => None,
    }
}

fn group_block(group: &str, style: &str) -> Option<&'static str> {
    match (group.to_ascii_lowercase().as_str(), style.to_ascii_lowercase().as_str()) {
        ("couple", "romantic") => Some(
            "- Group Type: COUPLE (ROMANTIC)
- Recommend: Romantic destinations perfect for dates and honeymoons
- Focus on: Intimate restaurants, sunset views, couples' activities, boutique hotels
",
        ),
        ("family", _) => Some(
            "- Group Type: FAMILY
- Recommend: Family-friendly destinations with activities for all ages
- Focus on: Safety, kid-friendly activities, family accommodations
- Avoid: Party destinations, extreme adventure only
",
        ),
        ("friends", _) => Some(
            "- Group Type: FRIENDS
- Recommend: Social destinations with nightlife and group activities
- Focus on: Group activities, social scenes, shared experiences
",
        ),
        _ => None,
    }
}

/// What the recommender needs for one batch.
#[derive(Debug, Clone)]
pub struct RecommendationInput {
    pub parsed: ParsedConstraints,
    pub count: usize,
}

impl RecommendationInput {
    pub fn new(parsed: ParsedConstraints, count: usize) -> Self {
        Self { parsed, count }
    }
}

/// Ranked destination candidates.
#[derive(Debug, Clone, Default)]
pub struct DestinationRecommender;

impl DestinationRecommender {
    fn context_block(&self, parsed: &ParsedConstraints) -> String {
        let constraints = &parsed.constraints;
        let duration = parsed.duration;
        let style = constraints.style().unwrap_or("cultural");
        let mut context = String::from("IMPORTANT CONTEXT-BASED RECOMMENDATIONS:\n");

        if !constraints.rejected_destinations.is_empty() {
            context.push_str(&format!(
                "- REJECTED DESTINATIONS (DO NOT RECOMMEND THESE):
  User has already rejected: {}
  * Find SIMILAR but DIFFERENT alternatives
  * Learn from rejections to understand what the traveler does not want
",
                constraints.rejected_destinations.join(", ")
            ));
        }

        if let Some(notes) = non_empty(constraints.additional_notes.as_deref()) {
            context.push_str(&format!(
                "- USER'S ADDITIONAL PREFERENCES:
  \"{notes}\"
  * Pay close attention to these new requirements
"
            ));
        }

        let range = non_empty(constraints.travel_range.as_deref()).and_then(travel_range_block);
        match (range, constraints.departure()) {
            (Some(range), departure) => {
                if let Some(departure) = departure {
                    context.push_str(&format!("- Departure City: {departure}\n"));
                }
                context.push_str(range);
            }
            (None, Some(departure)) => context.push_str(&proximity_block(departure, duration)),
            (None, None) => {}
        }

        context.push_str(&format!(
            "- VISA REQUIREMENTS:
  * ALWAYS mention visa requirements in the 'considerations' field
  * Note whether a visa is required, visa-free entry applies, or an eVisa is available
- DISTANCE INFORMATION:
  * In 'considerations', also mention approximate travel distance or time from {}
  * Examples: \"~2 hour drive\", \"~3 hour flight\"
",
            constraints.departure().unwrap_or("departure")
        ));

        if let Some(block) = style_block(style) {
            context.push_str(block);
        }

        if !constraints.interests.is_empty() {
            context.push_str(&format!(
                "- Specific Interests: {}\n- MUST match these interests in recommendations\n",
                constraints.interests.join(", ")
            ));
        }

        if let Some(season) = constraints.dates.as_deref().and_then(season_for) {
            context.push_str(&format!(
                "- Travel Season: {season}
  * Match activities to season (skiing in winter, beaches in summer)
  * Don't recommend snow activities in summer or beach activities in locations experiencing winter
"
            ));
        }

        if let Some(block) = constraints
            .group()
            .and_then(|group| group_block(group, style))
        {
            context.push_str(block);
        }

        if let Some(budget) = constraints.budget.filter(|budget| *budget > 0.0) {
            let daily = if duration > 0 {
                budget / duration as f64
            } else {
                budget
            };
            context.push_str(&format!(
                "- Total Budget: ${budget:.0} ({duration} days = ${daily:.0}/day)
- Recommend ONLY destinations where ${daily:.0}/day is realistic
- Consider: Accommodation, food, activities, transportation costs
"
            ));
        }

        context
    }
}

fn fallback_destinations(category: BudgetCategory) -> Vec<Destination> {
    #[allow(clippy::too_many_arguments)]
    fn destination(
        name: &str,
        country: &str,
        score: f64,
        reasoning: &str,
        highlights: &[&str],
        estimated_daily_cost: f64,
        best_for: &str,
        considerations: &str,
    ) -> Destination {
        Destination {
            name: name.to_string(),
            country: country.to_string(),
            score,
            reasoning: reasoning.to_string(),
            highlights: highlights.iter().map(|h| h.to_string()).collect(),
            estimated_daily_cost,
            best_for: best_for.to_string(),
            considerations: considerations.to_string(),
            ..Destination::default()
        }
    }

    if category == BudgetCategory::Budget {
        vec![
            destination(
                "Mexico City",
                "Mexico",
                85.0,
                "Great value destination with rich culture, excellent food, and budget-friendly accommodations.",
                &["Historic Center", "Teotihuacan Pyramids", "Street Food", "Museums", "Xochimilco"],
                60.0,
                "Culture, food, and history on a budget",
                "Altitude adjustment may be needed",
            ),
            destination(
                "Lisbon",
                "Portugal",
                82.0,
                "Affordable European destination with beautiful architecture, coastline, and vibrant culture.",
                &["Historic Trams", "Belém Tower", "Pastéis de Nata", "Alfama District"],
                80.0,
                "European charm on a budget",
                "Hilly terrain",
            ),
        ]
    } else {
        vec![
            destination(
                "Barcelona",
                "Spain",
                88.0,
                "World-class destination combining culture, architecture, beaches, and cuisine.",
                &["Sagrada Familia", "Park Güell", "Gothic Quarter", "Beaches", "Tapas"],
                150.0,
                "Balanced urban and beach experience",
                "Crowded in peak season",
            ),
            destination(
                "Kyoto",
                "Japan",
                86.0,
                "Rich cultural heritage, beautiful temples, gardens, and traditional experiences.",
                &["Fushimi Inari", "Bamboo Forest", "Temples", "Traditional Districts", "Cuisine"],
                180.0,
                "Cultural immersion and history",
                "Language barrier possible",
            ),
        ]
    }
}

impl PromptedStage for DestinationRecommender {
    type Input = RecommendationInput;
    type Response = DestinationBatch;
    type Output = DestinationBatch;

    fn name(&self) -> &'static str {
        "destination_recommendation"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn temperature(&self) -> f32 {
        0.8
    }

    fn render_prompt(&self, input: &RecommendationInput) -> Result<String> {
        let parsed = &input.parsed;
        let count = input.count;
        let summary = parsed.constraints.summary_lines().join("\n");
        let context = self.context_block(parsed);
        let departure = parsed.constraints.departure().unwrap_or("various cities");
        let style = parsed.constraints.style().unwrap_or("cultural");

        Ok(format!(
            "Recommend {count} HIGHLY CONTEXTUAL travel destinations for this specific traveler:

{summary}

Trip Duration: {} days
Budget Category: {}

{context}
Think like a knowledgeable travel agent who understands what travelers from {departure} typically enjoy for {style} trips.

Provide {count} well-matched, DIVERSE destination recommendations with detailed reasoning for each choice.",
            parsed.duration,
            parsed.budget_category.as_str(),
        ))
    }

    fn finish(&self, mut batch: DestinationBatch, input: &RecommendationInput) -> Result<DestinationBatch> {
        if batch.destinations.is_empty() {
            return Err(PlannerError::Format(
                "recommendation contained no destinations".to_string(),
            ));
        }

        let daily_budget = input.parsed.daily_budget;
        if daily_budget > 0.0 {
            for destination in batch.destinations.iter_mut() {
                let estimated = destination.estimated_daily_cost;
                if estimated > daily_budget * 1.5 {
                    destination.budget_warning =
                        Some(format!("Estimated cost (${estimated:.0}/day) exceeds budget"));
                } else if estimated > daily_budget {
                    destination.budget_note = Some("May need budget adjustments".to_string());
                }
            }
        }

        batch
            .destinations
            .sort_by(|a, b| b.score.total_cmp(&a.score));
        info!(count = batch.destinations.len(), "destinations ranked");
        Ok(batch)
    }

    fn fallback(&self, input: &RecommendationInput, error: &PlannerError) -> DestinationBatch {
        let category = input.parsed.budget_category;
        let style = input.parsed.constraints.style().unwrap_or("cultural");
        let mut destinations = fallback_destinations(category);
        destinations.truncate(FALLBACK_LIMIT);

        DestinationBatch {
            destinations,
            reasoning_summary: format!(
                "Using fallback recommendations due to processing error. Based on {style} style and {} budget.",
                category.as_str()
            ),
            fallback: FallbackInfo::from_error(error),
        }
    }
}
