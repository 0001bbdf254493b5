use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

use crate::config::PlacesSettings;
use crate::core::distance::{build_search_grid_with, DEFAULT_SUB_RADIUS_M};
use crate::core::events::{DiscoveryEvent, EventEnvelope, EventSink};
use crate::models::{GeoPoint, RawPlace};
use crate::services::places::{NearbyQuery, PlacesError, PlacesProvider};

/// Pagination limits for a single area search
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Per-request radius cap imposed by the provider
    pub radius_cap_m: f64,
    /// Wait before following a continuation token
    pub page_delay: Duration,
    pub max_results: usize,
    pub max_pages: usize,
    pub sub_radius_m: f64,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self::from(&PlacesSettings::default())
    }
}

impl From<&PlacesSettings> for FetchLimits {
    fn from(settings: &PlacesSettings) -> Self {
        Self {
            radius_cap_m: settings.request_radius_cap_m,
            page_delay: settings.page_delay(),
            max_results: settings.max_results_per_area,
            max_pages: settings.max_pages,
            sub_radius_m: DEFAULT_SUB_RADIUS_M,
        }
    }
}

impl FetchLimits {
    pub fn with_sub_radius(mut self, sub_radius_m: f64) -> Self {
        self.sub_radius_m = sub_radius_m;
        self
    }

    pub fn without_delay(mut self) -> Self {
        self.page_delay = Duration::ZERO;
        self
    }
}

/// Outcome of a single area search
#[derive(Debug, Clone, Default)]
pub struct AreaResult {
    pub places: Vec<RawPlace>,
    pub pages: usize,
    /// Set when a transport failure discarded the area
    pub failure: Option<String>,
}

/// Fetch all pages for one grid point
///
/// Stops after `max_pages` requests, once `max_results` places are collected,
/// or when no continuation token comes back. A non-OK provider status ends
/// pagination but keeps earlier pages; a transport failure discards the area.
pub async fn fetch_area_detailed(
    provider: &dyn PlacesProvider,
    point: GeoPoint,
    radius_m: f64,
    limits: &FetchLimits,
) -> AreaResult {
    let mut collected: Vec<RawPlace> = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0;

    loop {
        let query = NearbyQuery {
            location: point,
            radius_m: radius_m.min(limits.radius_cap_m),
            page_token: page_token.take(),
        };

        let page = match provider.nearby_search(&query).await {
            Ok(page) => page,
            Err(PlacesError::Status(status)) => {
                tracing::warn!("Search at {} stopped on status {}", point, status);
                break;
            }
            Err(e) => {
                tracing::warn!("Fetch error at {}: {}", point, e);
                return AreaResult {
                    places: Vec::new(),
                    pages: pages + 1,
                    failure: Some(e.to_string()),
                };
            }
        };
        pages += 1;

        tracing::debug!("Fetched {} restaurants at {} (page {})", page.results.len(), point, pages);
        collected.extend(page.results);

        match page.next_page_token {
            Some(token) if pages < limits.max_pages && collected.len() < limits.max_results => {
                // Continuation tokens only become valid after a short delay
                if !limits.page_delay.is_zero() {
                    tokio::time::sleep(limits.page_delay).await;
                }
                page_token = Some(token);
            }
            _ => break,
        }
    }

    AreaResult {
        places: collected,
        pages,
        failure: None,
    }
}

/// Fetch one grid point, returning an empty list on failure
pub async fn fetch_area(
    provider: &dyn PlacesProvider,
    point: GeoPoint,
    radius_m: f64,
    limits: &FetchLimits,
) -> Vec<RawPlace> {
    fetch_area_detailed(provider, point, radius_m, limits).await.places
}

/// Accumulates places across areas, first seen wins
#[derive(Debug, Default)]
pub struct PlaceDeduplicator {
    seen: HashSet<String>,
    places: Vec<RawPlace>,
}

impl PlaceDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch, returning how many were new
    pub fn extend(&mut self, batch: impl IntoIterator<Item = RawPlace>) -> usize {
        let before = self.places.len();
        for place in batch {
            if self.seen.insert(place.place_id.clone()) {
                self.places.push(place);
            }
        }
        self.places.len() - before
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn into_places(self) -> Vec<RawPlace> {
        self.places
    }
}

/// Search every grid point around `center` sequentially and merge the results
///
/// Emits a progress event after each grid point.
pub async fn run_discovery(
    provider: &dyn PlacesProvider,
    center: GeoPoint,
    radius_m: f64,
    limits: &FetchLimits,
    events: &dyn EventSink,
    run_id: Uuid,
) -> Vec<RawPlace> {
    let grid = build_search_grid_with(center, radius_m, limits.sub_radius_m);
    let total = grid.len();
    events.emit(EventEnvelope::new(run_id, DiscoveryEvent::GridBuilt { points: total }));

    let mut merged = PlaceDeduplicator::new();

    for (index, point) in grid.into_iter().enumerate() {
        let area = fetch_area_detailed(provider, point, radius_m, limits).await;
        let fetched = area.places.len();

        if let Some(reason) = area.failure {
            events.emit(EventEnvelope::new(
                run_id,
                DiscoveryEvent::AreaFailed { index: index + 1, reason },
            ));
        }

        let added = merged.extend(area.places);
        tracing::debug!("Area {} of {}: {} fetched, {} new", index + 1, total, fetched, added);

        events.emit(EventEnvelope::new(
            run_id,
            DiscoveryEvent::AreaSearched {
                index: index + 1,
                total,
                fetched,
                unique_total: merged.len(),
            },
        ));
    }

    tracing::info!("Total unique restaurants: {}", merged.len());
    merged.into_places()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::{ChannelSink, NoopSink};
    use crate::services::places::NearbyPage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn place(id: &str) -> RawPlace {
        RawPlace {
            place_id: id.to_string(),
            name: format!("Place {}", id),
            types: vec!["restaurant".to_string()],
            photos: vec![],
            price_level: None,
            rating: None,
            vicinity: String::new(),
            location: GeoPoint::new(0.0, 0.0),
        }
    }

    /// Replays scripted responses and records the queries it saw
    struct ScriptedProvider {
        pages: Mutex<Vec<Result<NearbyPage, PlacesError>>>,
        queries: Mutex<Vec<NearbyQuery>>,
    }

    impl ScriptedProvider {
        fn new(mut pages: Vec<Result<NearbyPage, PlacesError>>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PlacesProvider for ScriptedProvider {
        async fn nearby_search(&self, query: &NearbyQuery) -> Result<NearbyPage, PlacesError> {
            self.queries.lock().unwrap().push(query.clone());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(NearbyPage::default()))
        }
    }

    fn page(ids: &[&str], token: Option<&str>) -> Result<NearbyPage, PlacesError> {
        Ok(NearbyPage {
            results: ids.iter().map(|id| place(id)).collect(),
            next_page_token: token.map(str::to_string),
        })
    }

    fn limits() -> FetchLimits {
        FetchLimits::default().without_delay()
    }

    #[tokio::test]
    async fn test_follows_tokens_up_to_three_pages() {
        let provider = ScriptedProvider::new(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t2")),
            page(&["c"], Some("t3")),
            page(&["d"], None),
        ]);

        let places = fetch_area(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &limits()).await;

        assert_eq!(places.len(), 3);
        assert_eq!(provider.calls(), 3);
        let queries = provider.queries.lock().unwrap();
        assert_eq!(queries[0].page_token, None);
        assert_eq!(queries[1].page_token.as_deref(), Some("t1"));
        assert_eq!(queries[2].page_token.as_deref(), Some("t2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_before_each_token_only() {
        let provider = ScriptedProvider::new(vec![
            page(&["a"], Some("t1")),
            page(&["b"], Some("t2")),
            page(&["c"], Some("t3")),
        ]);
        let limits = FetchLimits::default();
        let start = tokio::time::Instant::now();

        let places = fetch_area(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &limits).await;

        assert_eq!(places.len(), 3);
        // Two tokens followed, none after the third page
        assert_eq!(limits.page_delay, Duration::from_secs(2));
        assert_eq!(start.elapsed(), limits.page_delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_page_does_not_wait() {
        let provider = ScriptedProvider::new(vec![page(&["a"], None)]);
        let start = tokio::time::Instant::now();

        fetch_area(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &FetchLimits::default()).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_stops_at_result_cap() {
        let twenty: Vec<String> = (0..20).map(|i| format!("p{}", i)).collect();
        let ids: Vec<&str> = twenty.iter().map(String::as_str).collect();
        let provider = ScriptedProvider::new(vec![page(&ids, Some("t1")), page(&["x"], None)]);

        let limits = FetchLimits {
            max_results: 20,
            ..limits()
        };
        let places = fetch_area(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &limits).await;

        assert_eq!(places.len(), 20);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_caps_request_radius() {
        let provider = ScriptedProvider::new(vec![page(&[], None)]);
        fetch_area(&provider, GeoPoint::new(1.0, 1.0), 80_000.0, &limits()).await;

        assert_eq!(provider.queries.lock().unwrap()[0].radius_m, 50_000.0);
    }

    #[tokio::test]
    async fn test_transport_failure_discards_area() {
        let provider = ScriptedProvider::new(vec![
            page(&["a"], Some("t1")),
            Err(PlacesError::InvalidResponse("truncated body".into())),
        ]);

        let area = fetch_area_detailed(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &limits()).await;

        assert!(area.places.is_empty());
        assert!(area.failure.is_some());
    }

    #[tokio::test]
    async fn test_bad_status_keeps_earlier_pages() {
        let provider = ScriptedProvider::new(vec![
            page(&["a", "b"], Some("t1")),
            Err(PlacesError::Status("INVALID_REQUEST".into())),
        ]);

        let places = fetch_area(&provider, GeoPoint::new(1.0, 1.0), 1500.0, &limits()).await;

        assert_eq!(places.len(), 2);
    }

    #[test]
    fn test_deduplicator_first_seen_wins() {
        let mut dedup = PlaceDeduplicator::new();
        let mut renamed = place("a");
        renamed.name = "Second copy".to_string();

        assert_eq!(dedup.extend(vec![place("a"), place("b")]), 2);
        assert_eq!(dedup.extend(vec![renamed, place("c")]), 1);

        let places = dedup.into_places();
        let ids: Vec<&str> = places.iter().map(|p| p.place_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(places[0].name, "Place a");
    }

    #[tokio::test]
    async fn test_run_discovery_dedups_and_reports_progress() {
        // 1500 m disc: five grid points, first two return overlapping pages
        let provider = ScriptedProvider::new(vec![page(&["a", "b"], None), page(&["a"], None)]);
        let (sink, mut rx) = ChannelSink::new();
        let run_id = Uuid::new_v4();

        let places = run_discovery(
            &provider,
            GeoPoint::new(37.7749, -122.4194),
            1500.0,
            &limits(),
            &sink,
            run_id,
        )
        .await;

        assert_eq!(places.len(), 2);

        let mut progress = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            assert_eq!(envelope.run_id, run_id);
            if let DiscoveryEvent::AreaSearched { index, total, .. } = envelope.event {
                progress.push((index, total));
            }
        }
        assert_eq!(progress.len(), provider.calls());
        assert_eq!(progress.first(), Some(&(1, provider.calls())));
    }

    #[tokio::test]
    async fn test_run_discovery_survives_failing_area() {
        let provider = ScriptedProvider::new(vec![
            Err(PlacesError::InvalidResponse("boom".into())),
            page(&["z"], None),
        ]);

        let places = run_discovery(
            &provider,
            GeoPoint::new(37.7749, -122.4194),
            1500.0,
            &limits(),
            &NoopSink,
            Uuid::new_v4(),
        )
        .await;

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].place_id, "z");
    }
}
