//! Screen-level state of one game: budget, search, tournament, swipe, results.
//!
//! [`GameSession`] is a plain reducer. Shells drive it with user actions and
//! discovery results and render whatever [`GameStage`] it reports.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DiscoverySettings;
use crate::core::discovery::Discovery;
use crate::core::events::{DiscoveryEvent, EventEnvelope, EventSink, NoopSink};
use crate::core::swipe::SwipeSession;
use crate::core::tournament::{RoundOutcome, Tournament, TournamentError};
use crate::error::DiscoveryError;
use crate::models::{
    CategorizedRestaurant, DiscoveryOutcome, DiscoveryRequest, GeoPoint, PriceLevel, SearchRadius,
};
use crate::services::location::{locate, LocationProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    Budget,
    Start,
    Cuisine,
    Restaurant,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Action not available in the {actual:?} stage (expected {expected:?})")]
    WrongStage { expected: GameStage, actual: GameStage },

    #[error(transparent)]
    Tournament(#[from] TournamentError),
}

pub struct GameSession {
    stage: GameStage,
    price_level: Option<PriceLevel>,
    radius: SearchRadius,
    settings: DiscoverySettings,
    run_id: Option<Uuid>,
    restaurants: Vec<CategorizedRestaurant>,
    tournament: Option<Tournament>,
    swipe: Option<SwipeSession>,
    last_error: Option<String>,
    events: Arc<dyn EventSink>,
}

impl GameSession {
    pub fn new(settings: &DiscoverySettings) -> Self {
        Self {
            stage: GameStage::Budget,
            price_level: None,
            radius: SearchRadius::clamped(
                settings.default_radius_m,
                settings.min_radius_m,
                settings.max_radius_m,
            ),
            settings: settings.clone(),
            run_id: None,
            restaurants: Vec::new(),
            tournament: None,
            swipe: None,
            last_error: None,
            events: Arc::new(NoopSink),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn stage(&self) -> GameStage {
        self.stage
    }

    pub fn price_level(&self) -> Option<PriceLevel> {
        self.price_level
    }

    pub fn radius(&self) -> SearchRadius {
        self.radius
    }

    pub fn restaurants(&self) -> &[CategorizedRestaurant] {
        &self.restaurants
    }

    pub fn tournament(&self) -> Option<&Tournament> {
        self.tournament.as_ref()
    }

    pub fn swipe(&self) -> Option<&SwipeSession> {
        self.swipe.as_ref()
    }

    /// Restaurants liked so far
    pub fn liked(&self) -> &[CategorizedRestaurant] {
        self.swipe.as_ref().map(SwipeSession::liked).unwrap_or(&[])
    }

    /// Message of the last failed discovery, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn expect_stage(&self, expected: GameStage) -> Result<(), SessionError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(SessionError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Some(run_id) = self.run_id {
            self.events.emit(EventEnvelope::new(run_id, event));
        }
    }

    /// Pick a budget (or none) and move on to the search screen
    pub fn choose_budget(&mut self, level: Option<PriceLevel>) -> Result<GameStage, SessionError> {
        self.expect_stage(GameStage::Budget)?;
        self.price_level = level;
        self.stage = GameStage::Start;
        Ok(self.stage)
    }

    /// Set the search radius, clamped to the configured slider bounds
    pub fn set_radius(&mut self, meters: f64) -> SearchRadius {
        self.radius =
            SearchRadius::clamped(meters, self.settings.min_radius_m, self.settings.max_radius_m);
        self.radius
    }

    pub fn discovery_request(&self, center: GeoPoint) -> DiscoveryRequest {
        DiscoveryRequest::new(center, self.radius, self.price_level)
    }

    /// Fold a discovery result into the session
    ///
    /// Success opens the cuisine tournament. Failure stays on the search
    /// screen and keeps the message for display.
    pub fn apply_discovery(
        &mut self,
        result: Result<DiscoveryOutcome, DiscoveryError>,
    ) -> Result<GameStage, SessionError> {
        self.expect_stage(GameStage::Start)?;

        match result {
            Ok(outcome) => {
                self.run_id = Some(outcome.run_id);
                self.restaurants = outcome.restaurants;
                self.tournament = Some(outcome.tournament);
                self.last_error = None;
                self.stage = GameStage::Cuisine;
            }
            Err(e) => {
                tracing::warn!("Discovery failed: {}", e);
                self.last_error = Some(e.to_string());
                self.stage = GameStage::Start;
            }
        }

        Ok(self.stage)
    }

    /// Locate, discover and apply the result in one step
    pub async fn discover(
        &mut self,
        discovery: &Discovery,
        location: &dyn LocationProvider,
    ) -> Result<GameStage, SessionError> {
        self.expect_stage(GameStage::Start)?;

        let result = match locate(location).await {
            Ok(center) => discovery.run(&self.discovery_request(center)).await,
            Err(e) => Err(DiscoveryError::from(e)),
        };

        self.apply_discovery(result)
    }

    /// Record the user's pick for the current cuisine match
    pub fn select_winner<R: Rng + ?Sized>(
        &mut self,
        cuisine: &str,
        rng: &mut R,
    ) -> Result<RoundOutcome, SessionError> {
        self.expect_stage(GameStage::Cuisine)?;
        let tournament = self
            .tournament
            .as_mut()
            .ok_or(TournamentError::AlreadyFinished)?;

        let outcome = tournament.select_winner(cuisine, rng)?;
        let rounds = tournament.round();
        let remaining = tournament.remaining().len();

        match &outcome {
            RoundOutcome::Next { round, matchup } => {
                self.emit(DiscoveryEvent::RoundAdvanced {
                    round: *round,
                    matchup: matchup.clone(),
                    remaining,
                });
            }
            RoundOutcome::Champion(winner) => {
                self.emit(DiscoveryEvent::TournamentFinished {
                    winner: winner.clone(),
                    rounds,
                });
                let swipe = SwipeSession::new(winner, &self.restaurants);
                self.stage = if swipe.is_exhausted() {
                    GameStage::Results
                } else {
                    GameStage::Restaurant
                };
                self.swipe = Some(swipe);
            }
        }

        Ok(outcome)
    }

    fn after_swipe(&mut self) -> GameStage {
        if self.swipe.as_ref().is_some_and(SwipeSession::is_exhausted) {
            self.stage = GameStage::Results;
        }
        self.stage
    }

    pub fn like(&mut self) -> Result<GameStage, SessionError> {
        self.expect_stage(GameStage::Restaurant)?;
        if let Some(swipe) = self.swipe.as_mut() {
            swipe.like();
        }
        Ok(self.after_swipe())
    }

    pub fn skip(&mut self) -> Result<GameStage, SessionError> {
        self.expect_stage(GameStage::Restaurant)?;
        if let Some(swipe) = self.swipe.as_mut() {
            swipe.skip();
        }
        Ok(self.after_swipe())
    }

    /// Back to budget selection with nothing carried over but the settings
    pub fn restart(&mut self) -> GameStage {
        let settings = self.settings.clone();
        let events = Arc::clone(&self.events);
        *self = Self::new(&settings).with_events(events);
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawPlace;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn restaurant(id: &str, cuisine: &str) -> CategorizedRestaurant {
        CategorizedRestaurant::new(
            RawPlace {
                place_id: id.to_string(),
                name: id.to_string(),
                types: vec!["restaurant".to_string()],
                photos: vec![],
                price_level: Some(2),
                rating: None,
                vicinity: String::new(),
                location: GeoPoint::new(0.0, 0.0),
            },
            cuisine,
        )
    }

    fn outcome() -> DiscoveryOutcome {
        let restaurants = vec![
            restaurant("a", "Italian"),
            restaurant("b", "Chinese"),
            restaurant("c", "Italian"),
        ];
        let cuisines = vec!["Italian".to_string(), "Chinese".to_string()];
        DiscoveryOutcome {
            run_id: Uuid::new_v4(),
            restaurants,
            available_cuisines: cuisines.clone(),
            total_places: 3,
            distribution: BTreeMap::new(),
            tournament: Tournament::start(cuisines).unwrap(),
        }
    }

    fn session_at_start() -> GameSession {
        let mut s = GameSession::new(&DiscoverySettings::default());
        s.choose_budget(PriceLevel::new(2)).unwrap();
        s
    }

    #[test]
    fn test_budget_then_start() {
        let mut s = GameSession::new(&DiscoverySettings::default());
        assert_eq!(s.stage(), GameStage::Budget);
        assert_eq!(s.choose_budget(PriceLevel::new(3)).unwrap(), GameStage::Start);
        assert_eq!(s.price_level(), PriceLevel::new(3));
        assert!(s.choose_budget(None).is_err());
    }

    #[test]
    fn test_radius_follows_settings_bounds() {
        let mut s = GameSession::new(&DiscoverySettings::default());
        assert_eq!(s.radius().meters(), 1500.0);
        assert_eq!(s.set_radius(100.0).meters(), 800.0);
        assert_eq!(s.set_radius(80_000.0).meters(), 50_000.0);
    }

    #[test]
    fn test_restart_restores_configured_radius() {
        let settings = DiscoverySettings {
            default_radius_m: 3000.0,
            min_radius_m: 1000.0,
            max_radius_m: 20_000.0,
            ..DiscoverySettings::default()
        };
        let mut s = GameSession::new(&settings);
        s.choose_budget(None).unwrap();
        s.set_radius(12_000.0);

        assert_eq!(s.restart(), GameStage::Budget);
        assert_eq!(s.radius().meters(), 3000.0);
        assert_eq!(s.set_radius(500.0).meters(), 1000.0);
        assert_eq!(s.set_radius(90_000.0).meters(), 20_000.0);
    }

    #[test]
    fn test_failed_discovery_stays_on_start() {
        let mut s = session_at_start();
        let stage = s
            .apply_discovery(Err(DiscoveryError::InsufficientVariety { found: 1 }))
            .unwrap();
        assert_eq!(stage, GameStage::Start);
        assert!(s.last_error().unwrap().contains("Try increasing the search radius"));
    }

    #[test]
    fn test_full_game() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = session_at_start();

        assert_eq!(s.apply_discovery(Ok(outcome())).unwrap(), GameStage::Cuisine);
        assert!(s.last_error().is_none());

        let result = s.select_winner("Italian", &mut rng).unwrap();
        assert_eq!(result, RoundOutcome::Champion("Italian".to_string()));
        assert_eq!(s.stage(), GameStage::Restaurant);
        assert_eq!(s.swipe().unwrap().restaurants().len(), 2);

        assert_eq!(s.like().unwrap(), GameStage::Restaurant);
        assert_eq!(s.skip().unwrap(), GameStage::Results);
        let liked: Vec<&str> = s.liked().iter().map(|r| r.id()).collect();
        assert_eq!(liked, vec!["a"]);

        assert_eq!(s.restart(), GameStage::Budget);
        assert!(s.liked().is_empty());
        assert!(s.tournament().is_none());
        assert!(s.price_level().is_none());
    }

    #[test]
    fn test_actions_checked_against_stage() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = GameSession::new(&DiscoverySettings::default());
        assert!(matches!(
            s.select_winner("Thai", &mut rng),
            Err(SessionError::WrongStage { expected: GameStage::Cuisine, .. })
        ));
        assert!(s.like().is_err());
        assert!(s.apply_discovery(Ok(outcome())).is_err());
    }
}
