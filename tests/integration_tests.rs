// Integration tests for Platepick

use async_trait::async_trait;
use platepick::config::DiscoverySettings;
use platepick::core::{
    events::ChannelSink, Discovery, DiscoveryEvent, FetchLimits, GameSession, GameStage,
    HeuristicCategorizer, RoundOutcome,
};
use platepick::error::DiscoveryError;
use platepick::models::{GeoPoint, PriceLevel, RawPlace};
use platepick::services::location::FixedLocation;
use platepick::services::places::{NearbyPage, NearbyQuery, PlacesError, PlacesProvider};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const SAN_FRANCISCO: GeoPoint = GeoPoint::new(37.7749, -122.4194);

fn create_test_place(id: &str, name: &str, types: &[&str], price: Option<u8>) -> RawPlace {
    RawPlace {
        place_id: id.to_string(),
        name: name.to_string(),
        types: types.iter().map(|t| t.to_string()).collect(),
        photos: vec![],
        price_level: price,
        rating: Some(4.4),
        vicinity: "Market St".to_string(),
        location: SAN_FRANCISCO,
    }
}

/// First area gets `first`, every later area gets `rest`
struct TwoPageProvider {
    first: Vec<RawPlace>,
    rest: Vec<RawPlace>,
    calls: AtomicUsize,
    queries: Mutex<Vec<NearbyQuery>>,
}

impl TwoPageProvider {
    fn new(first: Vec<RawPlace>, rest: Vec<RawPlace>) -> Self {
        Self {
            first,
            rest,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlacesProvider for TwoPageProvider {
    async fn nearby_search(&self, query: &NearbyQuery) -> Result<NearbyPage, PlacesError> {
        self.queries.lock().unwrap().push(query.clone());
        let results = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.first.clone()
        } else {
            self.rest.clone()
        };
        Ok(NearbyPage {
            results,
            next_page_token: None,
        })
    }
}

fn create_discovery(provider: Arc<TwoPageProvider>) -> Discovery {
    Discovery::new(
        provider,
        Arc::new(HeuristicCategorizer::new()),
        FetchLimits::default().without_delay(),
    )
}

#[tokio::test]
async fn test_integration_end_to_end_discovery() {
    let pizza = create_test_place("A", "Tony's Pizza", &["restaurant"], Some(2));
    let dragon = create_test_place("B", "Golden Dragon", &["chinese_restaurant"], Some(2));
    let provider = Arc::new(TwoPageProvider::new(
        vec![pizza.clone(), dragon],
        vec![pizza],
    ));
    let (sink, mut events) = ChannelSink::new();
    let discovery = create_discovery(provider.clone()).with_events(Arc::new(sink));

    let outcome = discovery
        .start_discovery(SAN_FRANCISCO, 1500.0, None)
        .await
        .unwrap();

    // Five grid points, one request each
    assert_eq!(provider.queries.lock().unwrap().len(), 5);
    assert_eq!(outcome.total_places, 2);
    assert_eq!(outcome.available_cuisines, vec!["Italian", "Chinese"]);

    let mut tournament = outcome.tournament.clone();
    let mut rng = StdRng::seed_from_u64(42);
    let result = tournament.select_winner("Italian", &mut rng).unwrap();
    assert_eq!(result, RoundOutcome::Champion("Italian".to_string()));

    let italian: Vec<&str> = outcome.restaurants_for("Italian").map(|r| r.id()).collect();
    assert_eq!(italian, vec!["A"]);

    let mut kinds = Vec::new();
    while let Ok(envelope) = events.try_recv() {
        assert_eq!(envelope.run_id, outcome.run_id);
        kinds.push(envelope.event);
    }
    assert_eq!(kinds.first(), Some(&DiscoveryEvent::GridBuilt { points: 5 }));
    assert!(kinds
        .iter()
        .any(|e| matches!(e, DiscoveryEvent::TournamentStarted { .. })));
}

#[tokio::test]
async fn test_integration_price_filter_can_starve_variety() {
    let provider = Arc::new(TwoPageProvider::new(
        vec![
            create_test_place("A", "Tony's Pizza", &["restaurant"], Some(1)),
            create_test_place("B", "Golden Dragon", &["chinese_restaurant"], Some(3)),
        ],
        vec![],
    ));
    let discovery = create_discovery(provider);

    let err = discovery
        .start_discovery(SAN_FRANCISCO, 1500.0, PriceLevel::new(1))
        .await
        .unwrap_err();

    assert!(matches!(err, DiscoveryError::InsufficientVariety { found: 1 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_integration_full_game_session() {
    let provider = Arc::new(TwoPageProvider::new(
        vec![
            create_test_place("A", "Tony's Pizza", &["restaurant"], Some(2)),
            create_test_place("B", "Golden Dragon", &["chinese_restaurant"], Some(2)),
            create_test_place("C", "Pho 99", &["restaurant"], Some(2)),
            create_test_place("D", "Luigi's Trattoria", &["restaurant"], Some(2)),
        ],
        vec![],
    ));
    let discovery = create_discovery(provider);
    let location = FixedLocation::new(SAN_FRANCISCO);
    let mut rng = StdRng::seed_from_u64(7);

    let mut session = GameSession::new(&DiscoverySettings::default());
    session.choose_budget(PriceLevel::new(2)).unwrap();
    session.set_radius(900.0);

    assert_eq!(session.discover(&discovery, &location).await.unwrap(), GameStage::Cuisine);

    // Always back Italian until it wins
    loop {
        let matchup = session.tournament().unwrap().current_match().cloned().unwrap();
        let pick = if matchup.contains("Italian") {
            "Italian".to_string()
        } else {
            matchup.first.clone()
        };
        if let RoundOutcome::Champion(winner) = session.select_winner(&pick, &mut rng).unwrap() {
            assert_eq!(winner, "Italian");
            break;
        }
    }

    assert_eq!(session.stage(), GameStage::Restaurant);
    session.like().unwrap();
    assert_eq!(session.like().unwrap(), GameStage::Results);

    let liked: Vec<&str> = session.liked().iter().map(|r| r.id()).collect();
    assert_eq!(liked, vec!["A", "D"]);
}

#[tokio::test]
async fn test_integration_denied_location_keeps_start_stage() {
    let discovery = create_discovery(Arc::new(TwoPageProvider::new(vec![], vec![])));
    let mut session = GameSession::new(&DiscoverySettings::default());
    session.choose_budget(None).unwrap();

    let stage = session
        .discover(&discovery, &FixedLocation::denied())
        .await
        .unwrap();

    assert_eq!(stage, GameStage::Start);
    assert_eq!(session.last_error(), Some("Permission to access location was denied"));
}
