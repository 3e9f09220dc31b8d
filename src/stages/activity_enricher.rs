use std::marker::PhantomData;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    completion_schema,
    error::{PlannerError, Result},
    schemas::CompletionSchema,
    services::{PageScraper, TextGenerator},
    stages::{execute, PromptedStage},
    types::{
        Activity, ActivityDetails, EnrichedActivity, FallbackInfo, HotelOption, RestaurantOption,
        TransportLeg, TransportOptions,
    },
};

const ACTIVITY_SYSTEM_PROMPT: &str =
    "You are a travel expert providing detailed, accurate information with sources.";
const TRANSPORT_SYSTEM_PROMPT: &str =
    "You are a travel transportation expert providing accurate route and booking information.";

/// Prompt family an activity is enriched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityCategory {
    Accommodation,
    Dining,
    Attraction,
    Generic,
}

impl ActivityCategory {
    pub fn classify(activity: &Activity) -> Self {
        let name = activity.name.to_lowercase();
        let kind = activity.kind.to_lowercase();
        let name_mentions = |words: &[&str]| words.iter().any(|word| name.contains(word));

        if name_mentions(&["hotel", "check-in", "accommodation"]) {
            ActivityCategory::Accommodation
        } else if kind == "dining"
            || name_mentions(&["lunch", "dinner", "breakfast", "restaurant", "dining", "meal"])
        {
            ActivityCategory::Dining
        } else if kind == "sightseeing" || kind == "cultural" {
            ActivityCategory::Attraction
        } else {
            ActivityCategory::Generic
        }
    }
}

/// A per-category response that folds into [`ActivityDetails`].
pub trait DetailBrief: CompletionSchema {
    fn into_details(self) -> ActivityDetails;

    fn render_prompt(activity: &Activity, destination: &str, day_number: u32) -> String;
}

/// Check-in guidance plus a spread of hotels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct LodgingDetails {
    #[serde(default)]
    pub description: Option<String>,
    /// Check-in timing
    #[serde(default)]
    pub time_slot: Option<String>,
    /// Average nightly price range
    #[serde(default)]
    pub cost_details: Option<String>,
    /// Airport or station transfer options
    #[serde(default)]
    pub transport_notes: Option<String>,
    /// Hotel search link for the destination
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Three or four hotels across price ranges
    #[serde(default)]
    pub hotel_examples: Vec<HotelOption>,
}

impl DetailBrief for LodgingDetails {
    fn into_details(self) -> ActivityDetails {
        ActivityDetails {
            description: self.description,
            time_slot: self.time_slot,
            cost_details: self.cost_details,
            transport_notes: self.transport_notes,
            booking_url: self.booking_url,
            sources: self.sources,
            hotel_examples: self.hotel_examples,
            ..ActivityDetails::default()
        }
    }

    fn render_prompt(activity: &Activity, destination: &str, day_number: u32) -> String {
        format!(
            "Provide detailed hotel check-in information for {destination}:

Activity: {}
Location: {destination}
Day: {day_number}

Provide:
1. Recommended hotel areas in {destination}
2. Average hotel price range
3. A link to search hotels in {destination}
4. Airport/arrival transportation options to hotels
5. Check-in timing and tips
6. 3-4 specific hotel examples with different price ranges",
            activity.name
        )
    }
}

/// Dining scene plus specific restaurants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct DiningDetails {
    #[serde(default)]
    pub description: Option<String>,
    /// Recommended dining time
    #[serde(default)]
    pub time_slot: Option<String>,
    /// Average cost per person
    #[serde(default)]
    pub cost_details: Option<String>,
    #[serde(default)]
    pub transport_notes: Option<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    /// Three or four restaurants across cuisines and price ranges
    #[serde(default)]
    pub restaurant_options: Vec<RestaurantOption>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl DetailBrief for DiningDetails {
    fn into_details(self) -> ActivityDetails {
        ActivityDetails {
            description: self.description,
            time_slot: self.time_slot,
            cost_details: self.cost_details,
            transport_notes: self.transport_notes,
            tips: self.tips,
            restaurant_options: self.restaurant_options,
            sources: self.sources,
            ..ActivityDetails::default()
        }
    }

    fn render_prompt(activity: &Activity, destination: &str, day_number: u32) -> String {
        format!(
            "Provide detailed dining information and specific restaurant recommendations for {destination}:

Activity: {}
Location: {destination}
Day: {day_number}

Provide:
1. Description of the dining scene or area
2. Recommended dining time
3. Average cost per person
4. 3-4 specific restaurant recommendations covering different cuisines and price ranges",
            activity.name
        )
    }
}

/// Availability check for a sight.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct AttractionDetails {
    #[serde(default)]
    pub description: Option<String>,
    /// open, closed or limited
    #[serde(default)]
    pub availability_status: Option<String>,
    /// Closure or renovation details when not fully open
    #[serde(default)]
    pub closure_notice: Option<String>,
    /// Recommended visit time
    #[serde(default)]
    pub time_slot: Option<String>,
    /// Entrance fee details
    #[serde(default)]
    pub cost_details: Option<String>,
    /// Official website
    #[serde(default)]
    pub booking_url: Option<String>,
    /// How to get there from the city center
    #[serde(default)]
    pub transport_notes: Option<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl DetailBrief for AttractionDetails {
    fn into_details(self) -> ActivityDetails {
        ActivityDetails {
            description: self.description,
            availability_status: self.availability_status,
            closure_notice: self.closure_notice,
            time_slot: self.time_slot,
            cost_details: self.cost_details,
            booking_url: self.booking_url,
            transport_notes: self.transport_notes,
            tips: self.tips,
            sources: self.sources,
            ..ActivityDetails::default()
        }
    }

    fn render_prompt(activity: &Activity, destination: &str, _day_number: u32) -> String {
        format!(
            "Check if this attraction is currently available and provide details:

Activity: {}
Location: {destination}

IMPORTANT:
1. Check if this attraction has any closures, renovations, or alerts
2. Provide the official website link
3. Include current ticket prices if available
4. Opening hours
5. How to get there from the city center",
            activity.name
        )
    }
}

/// Catch-all activity details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[completion_schema]
pub struct GeneralDetails {
    #[serde(default)]
    pub description: Option<String>,
    /// Specific timing
    #[serde(default)]
    pub time_slot: Option<String>,
    /// Estimated cost per person in USD
    #[serde(default)]
    pub cost_estimate: Option<f64>,
    #[serde(default)]
    pub cost_details: Option<String>,
    /// required, recommended or not_needed
    #[serde(default)]
    pub booking_info: Option<String>,
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub transport_notes: Option<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub official_links: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl DetailBrief for GeneralDetails {
    fn into_details(self) -> ActivityDetails {
        ActivityDetails {
            description: self.description,
            time_slot: self.time_slot,
            cost_estimate: self.cost_estimate,
            cost_details: self.cost_details,
            booking_info: self.booking_info,
            booking_url: self.booking_url,
            transport_notes: self.transport_notes,
            tips: self.tips,
            official_links: self.official_links,
            sources: self.sources,
            ..ActivityDetails::default()
        }
    }

    fn render_prompt(activity: &Activity, destination: &str, _day_number: u32) -> String {
        format!(
            "Provide detailed information for this travel activity:

Activity: {}
Type: {}
Location: {destination}

Provide: description, specific timing, costs, booking info, transport, tips, official links, sources",
            activity.name, activity.kind
        )
    }
}

fn basic_activity_cost(kind: &str) -> f64 {
    match kind {
        "dining" => 30.0,
        "sightseeing" => 20.0,
        "adventure" => 60.0,
        "cultural" => 15.0,
        "relaxation" => 40.0,
        _ => 25.0,
    }
}

/// Templated enrichment for one activity; fields already present are kept.
pub fn basic_activity_enrichment(activity: &Activity) -> Activity {
    let mut activity = activity.clone();
    let kind = if activity.kind.trim().is_empty() {
        "travel"
    } else {
        activity.kind.as_str()
    };

    let details = &mut activity.details;
    if details.description.is_none() {
        details.description = Some(format!(
            "Enjoy {} - a great {kind} experience.",
            activity.name
        ));
    }
    details
        .cost_estimate
        .get_or_insert(basic_activity_cost(&activity.kind));
    if details.tips.is_empty() {
        details.tips = vec![
            "Check opening hours in advance".to_string(),
            "Book tickets online if possible".to_string(),
        ];
    }
    activity
}

#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub activity: Activity,
    pub destination: String,
    pub day_number: u32,
}

/// Per-activity stage parameterized by its response shape.
pub struct ActivityStage<R> {
    _brief: PhantomData<fn() -> R>,
}

impl<R> Default for ActivityStage<R> {
    fn default() -> Self {
        Self {
            _brief: PhantomData,
        }
    }
}

impl<R: DetailBrief> PromptedStage for ActivityStage<R> {
    type Input = ActivityInput;
    type Response = R;
    type Output = EnrichedActivity;

    fn name(&self) -> &'static str {
        "activity_enrichment"
    }

    fn system_prompt(&self) -> &str {
        ACTIVITY_SYSTEM_PROMPT
    }

    fn temperature(&self) -> f32 {
        0.6
    }

    fn render_prompt(&self, input: &ActivityInput) -> Result<String> {
        Ok(R::render_prompt(
            &input.activity,
            &input.destination,
            input.day_number,
        ))
    }

    fn finish(&self, response: R, input: &ActivityInput) -> Result<EnrichedActivity> {
        let mut activity = input.activity.clone();
        activity.enrich_with(response.into_details());
        Ok(EnrichedActivity {
            activity,
            fallback: FallbackInfo::default(),
        })
    }

    fn fallback(&self, input: &ActivityInput, error: &PlannerError) -> EnrichedActivity {
        EnrichedActivity {
            activity: basic_activity_enrichment(&input.activity),
            fallback: FallbackInfo::from_error(error),
        }
    }
}

/// One leg between the departure city and the destination.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub origin: String,
    pub destination: String,
    pub destination_country: String,
    pub leg: TransportLeg,
}

impl TransportRequest {
    /// Outbound or return leg between `home` and the destination.
    pub fn new(home: &str, destination: &str, destination_country: &str, leg: TransportLeg) -> Self {
        let (origin, target) = match leg {
            TransportLeg::TransportTo => (home, destination),
            TransportLeg::TransportBack => (destination, home),
        };
        Self {
            origin: origin.to_string(),
            destination: target.to_string(),
            destination_country: destination_country.to_string(),
            leg,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransportStage;

impl PromptedStage for TransportStage {
    type Input = TransportRequest;
    type Response = TransportOptions;
    type Output = TransportOptions;

    fn name(&self) -> &'static str {
        "transport_enrichment"
    }

    fn system_prompt(&self) -> &str {
        TRANSPORT_SYSTEM_PROMPT
    }

    fn temperature(&self) -> f32 {
        0.5
    }

    fn render_prompt(&self, input: &TransportRequest) -> Result<String> {
        let direction = if input.leg.is_outbound() {
            "Outbound (going to destination)"
        } else {
            "Return (coming back home)"
        };
        Ok(format!(
            "Provide detailed transportation options from {} to {}, {}:

Direction: {direction}

Provide comprehensive transportation details:
1. Flight options (airlines, approximate duration, price range)
2. Alternative transportation (train, bus, car) if applicable
3. Airport/station names and codes
4. Estimated travel time for each option
5. Average costs for each option
6. Booking recommendations and websites
7. Tips for this specific route",
            input.origin, input.destination, input.destination_country
        ))
    }

    fn finish(&self, options: TransportOptions, input: &TransportRequest) -> Result<TransportOptions> {
        Ok(options.for_leg(input.leg, &input.origin, &input.destination))
    }

    fn fallback(&self, input: &TransportRequest, error: &PlannerError) -> TransportOptions {
        TransportOptions {
            description: format!(
                "Travel from {} to {}. Check flight aggregators like Google Flights, Skyscanner, or Kayak for the best options.",
                input.origin, input.destination
            ),
            tips: vec![
                "Book flights 2-3 months in advance for best prices".to_string(),
                "Compare prices across multiple booking sites".to_string(),
                "Consider airport location and transfer times".to_string(),
            ],
            fallback: FallbackInfo::from_error(error),
            ..TransportOptions::default()
        }
        .for_leg(input.leg, &input.origin, &input.destination)
    }
}

/// Per-activity and transportation enrichment used by the streaming path.
#[derive(Debug, Clone)]
pub struct ActivityEnricher {
    scraper: PageScraper,
    fetch_pages: bool,
}

impl Default for ActivityEnricher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityEnricher {
    pub fn new() -> Self {
        Self {
            scraper: PageScraper::new(),
            fetch_pages: true,
        }
    }

    /// Toggle the follow-up fetch of linked pages.
    pub fn with_page_fetch(mut self, enabled: bool) -> Self {
        self.fetch_pages = enabled;
        self
    }

    pub async fn enrich_activity(
        &self,
        generator: &dyn TextGenerator,
        activity: &Activity,
        destination: &str,
        day_number: u32,
    ) -> EnrichedActivity {
        let input = ActivityInput {
            activity: activity.clone(),
            destination: destination.to_string(),
            day_number,
        };
        let category = ActivityCategory::classify(activity);
        debug!(activity = %activity.name, ?category, "enriching activity");

        let mut enriched = match category {
            ActivityCategory::Accommodation => {
                execute(&ActivityStage::<LodgingDetails>::default(), generator, &input).await
            }
            ActivityCategory::Dining => {
                execute(&ActivityStage::<DiningDetails>::default(), generator, &input).await
            }
            ActivityCategory::Attraction => {
                execute(&ActivityStage::<AttractionDetails>::default(), generator, &input).await
            }
            ActivityCategory::Generic => {
                execute(&ActivityStage::<GeneralDetails>::default(), generator, &input).await
            }
        };

        if self.fetch_pages && !enriched.fallback.is_fallback() {
            self.attach_page_details(&mut enriched.activity).await;
        }
        enriched
    }

    async fn attach_page_details(&self, activity: &mut Activity) {
        let Some(url) = activity.details.primary_link().map(str::to_string) else {
            return;
        };
        match self.scraper.fetch_details(&url).await {
            Ok(details) => activity.details.page_details = Some(details),
            Err(err) => debug!(url, error = %err, "page details unavailable"),
        }
    }

    pub async fn enrich_transportation(
        &self,
        generator: &dyn TextGenerator,
        request: &TransportRequest,
    ) -> TransportOptions {
        info!(
            origin = %request.origin,
            destination = %request.destination,
            outbound = request.leg.is_outbound(),
            "enriching transportation"
        );
        execute(&TransportStage, generator, request).await
    }
}
