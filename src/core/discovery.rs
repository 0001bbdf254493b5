use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::{PlacesSettings, Settings};
use crate::core::categorizer::{distribution, CuisineCategorizer, HeuristicCategorizer};
use crate::core::events::{DiscoveryEvent, EventEnvelope, EventSink, TracingSink};
use crate::core::search::{run_discovery, FetchLimits};
use crate::core::tournament::Tournament;
use crate::error::DiscoveryError;
use crate::models::{
    CategorizedRestaurant, CuisineLabel, DiscoveryOutcome, DiscoveryRequest, GeoPoint, PriceLevel,
    RawPlace, Restaurant, SearchRadius, FALLBACK_CUISINE,
};
use crate::services::llm::{LlmCategorizer, OpenAiClient};
use crate::services::location::{locate, LocationProvider};
use crate::services::places::{PhotoUrlBuilder, PlacesClient, PlacesError, PlacesProvider};

/// Discovery orchestrator - turns a location and radius into a seeded tournament
///
/// # Pipeline Stages
/// 1. Grid search with pagination and deduplication
/// 2. Optional exact price-level filter
/// 3. Batch categorization
/// 4. Removal of the fallback bucket
/// 5. Variety check and tournament seeding
///
/// Only one run may be in flight per orchestrator; a concurrent call gets
/// [`DiscoveryError::Busy`].
pub struct Discovery {
    places: Arc<dyn PlacesProvider>,
    categorizer: Arc<dyn CuisineCategorizer>,
    events: Arc<dyn EventSink>,
    photos: PhotoUrlBuilder,
    limits: FetchLimits,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a run ends, however it ends
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Discovery {
    pub fn new(
        places: Arc<dyn PlacesProvider>,
        categorizer: Arc<dyn CuisineCategorizer>,
        limits: FetchLimits,
    ) -> Self {
        Self {
            places,
            categorizer,
            events: Arc::new(TracingSink),
            photos: PhotoUrlBuilder::new(&PlacesSettings::default()),
            limits,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Wire the real Places client and the configured categorizer
    ///
    /// The LLM categorizer is used only when enabled and keyed; otherwise
    /// the heuristic table is used.
    pub fn from_settings(settings: &Settings) -> Result<Self, PlacesError> {
        let client = PlacesClient::new(&settings.places)?;
        let photos = client.photo_urls().clone();
        let places = Arc::new(client);
        let limits = FetchLimits::from(&settings.places).with_sub_radius(settings.discovery.sub_radius_m);

        let categorizer: Arc<dyn CuisineCategorizer> =
            if settings.llm.enabled && !settings.llm.api_key.is_empty() {
                match OpenAiClient::new(&settings.llm) {
                    Ok(client) => Arc::new(LlmCategorizer::new(Arc::new(client), &settings.llm)),
                    Err(e) => {
                        tracing::warn!("LLM client unavailable ({}), using heuristic categorizer", e);
                        Arc::new(HeuristicCategorizer::new())
                    }
                }
            } else {
                Arc::new(HeuristicCategorizer::new())
            };

        tracing::info!("Discovery initialized with {} categorizer", categorizer.name());

        Ok(Self::new(places, categorizer, limits).with_photos(photos))
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_photos(mut self, photos: PhotoUrlBuilder) -> Self {
        self.photos = photos;
        self
    }

    /// Card views for the restaurants of one cuisine, in discovery order
    pub fn cards(&self, outcome: &DiscoveryOutcome, cuisine: &str) -> Vec<Restaurant> {
        outcome
            .restaurants_for(cuisine)
            .map(|r| self.photos.card(r))
            .collect()
    }

    pub fn events(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.events)
    }

    pub fn categorizer_name(&self) -> &'static str {
        self.categorizer.name()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<RunGuard<'_>, DiscoveryError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DiscoveryError::Busy)?;
        Ok(RunGuard(&self.in_flight))
    }

    fn emit(&self, run_id: Uuid, event: DiscoveryEvent) {
        self.events.emit(EventEnvelope::new(run_id, event));
    }

    /// Validate a request and run discovery for it
    pub async fn run(&self, request: &DiscoveryRequest) -> Result<DiscoveryOutcome, DiscoveryError> {
        request.validate()?;
        self.start_discovery(request.center(), request.radius_m, request.price())
            .await
    }

    /// Resolve the device location, then run discovery around it
    pub async fn discover_here(
        &self,
        location: &dyn LocationProvider,
        radius_m: f64,
        price_level: Option<PriceLevel>,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let center = locate(location).await?;
        self.start_discovery(center, radius_m, price_level).await
    }

    /// Run the full discovery pipeline around `center`
    pub async fn start_discovery(
        &self,
        center: GeoPoint,
        radius_m: f64,
        price_level: Option<PriceLevel>,
    ) -> Result<DiscoveryOutcome, DiscoveryError> {
        let _guard = self.begin()?;
        let run_id = Uuid::new_v4();
        let radius_m = SearchRadius::new(radius_m).meters();

        tracing::info!(
            %run_id,
            "Starting discovery at {} (radius {:.0}m, price {:?})",
            center,
            radius_m,
            price_level.map(PriceLevel::value)
        );

        // Stage 1: grid search
        let places = run_discovery(
            self.places.as_ref(),
            center,
            radius_m,
            &self.limits,
            self.events.as_ref(),
            run_id,
        )
        .await;
        let total_places = places.len();

        // Stage 2: budget filter
        let places = filter_by_price(places, price_level);

        // Stage 3: categorize
        let labels = self.categorizer.categorize_batch(&places).await;
        let categorized: Vec<CategorizedRestaurant> = places
            .into_iter()
            .map(|place| {
                let cuisine = labels
                    .get(&place.place_id)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK_CUISINE.to_string());
                CategorizedRestaurant::new(place, cuisine)
            })
            .collect();

        let counts = distribution(categorized.iter().map(|r| &r.cuisine_category));
        self.emit(run_id, DiscoveryEvent::Categorized { distribution: counts.clone() });

        // Stage 4: drop the fallback bucket
        let restaurants: Vec<CategorizedRestaurant> =
            categorized.into_iter().filter(|r| !r.is_fallback()).collect();
        tracing::info!("Valid restaurants after filtering: {}", restaurants.len());

        // Stage 5: variety check and seeding
        let available_cuisines = distinct_cuisines(&restaurants);
        if available_cuisines.len() < 2 {
            self.emit(
                run_id,
                DiscoveryEvent::InsufficientVariety { found: available_cuisines.len() },
            );
            return Err(DiscoveryError::InsufficientVariety {
                found: available_cuisines.len(),
            });
        }

        let tournament = Tournament::start(available_cuisines.clone()).map_err(|_| {
            DiscoveryError::InsufficientVariety {
                found: available_cuisines.len(),
            }
        })?;

        if let Some(matchup) = tournament.current_match() {
            self.emit(
                run_id,
                DiscoveryEvent::TournamentStarted {
                    cuisines: available_cuisines.clone(),
                    matchup: matchup.clone(),
                },
            );
        }

        Ok(DiscoveryOutcome {
            run_id,
            restaurants,
            available_cuisines,
            total_places,
            distribution: counts,
            tournament,
        })
    }
}

/// Keep only places whose provider price level equals `level`
pub fn filter_by_price(places: Vec<RawPlace>, level: Option<PriceLevel>) -> Vec<RawPlace> {
    match level {
        Some(level) => places
            .into_iter()
            .filter(|p| p.price_level == Some(level.value()))
            .collect(),
        None => places,
    }
}

/// Distinct cuisines in first-seen order
pub fn distinct_cuisines(restaurants: &[CategorizedRestaurant]) -> Vec<CuisineLabel> {
    let mut cuisines: Vec<CuisineLabel> = Vec::new();
    for restaurant in restaurants {
        if !cuisines.contains(&restaurant.cuisine_category) {
            cuisines.push(restaurant.cuisine_category.clone());
        }
    }
    cuisines
}
