use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::PlacesSettings;
use crate::models::{CategorizedRestaurant, GeoPoint, PlacePhoto, RawPlace, Restaurant};

/// Keywords that mark a photo attribution as showing food
const FOOD_PHOTO_KEYWORDS: &[&str] = &[
    "food", "dish", "meal", "plate", "menu", "pizza", "sushi", "burger", "dessert", "cuisine",
];

/// Errors that can occur when calling the places provider
#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Places API returned status {0}")]
    Status(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// One nearby-search request
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub location: GeoPoint,
    pub radius_m: f64,
    pub page_token: Option<String>,
}

/// One page of nearby-search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearbyPage {
    pub results: Vec<RawPlace>,
    pub next_page_token: Option<String>,
}

/// Extra fields from the details endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceDetails {
    pub place_id: String,
    pub photos: Vec<PlacePhoto>,
    pub price_level: Option<u8>,
    pub types: Vec<String>,
}

/// Places search capability, one page per call
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    async fn nearby_search(&self, query: &NearbyQuery) -> Result<NearbyPage, PlacesError>;
}

// Wire format of the Places web service

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    next_page_token: Option<String>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    result: Option<DetailsResult>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    #[serde(default)]
    photos: Vec<PlacePhoto>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    place_id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    photos: Vec<PlacePhoto>,
    #[serde(default)]
    price_level: Option<u8>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    vicinity: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl PlaceResult {
    /// Records without an id or name are useless for dedup and display
    fn into_raw_place(self) -> Option<RawPlace> {
        let place_id = self.place_id?;
        let name = self.name?;
        let location = self
            .geometry
            .map(|g| GeoPoint::new(g.location.lat, g.location.lng))
            .unwrap_or(GeoPoint::new(0.0, 0.0));

        Some(RawPlace {
            place_id,
            name,
            types: self.types,
            photos: self.photos,
            price_level: self.price_level,
            rating: self.rating,
            vicinity: self.vicinity.unwrap_or_default(),
            location,
        })
    }
}

/// Places web service client
///
/// Handles:
/// - Nearby search pages (type `restaurant`)
/// - Place details for photo selection
/// - Photo URL construction
pub struct PlacesClient {
    base_url: String,
    api_key: String,
    radius_cap_m: f64,
    client: Client,
    photos: PhotoUrlBuilder,
}

impl PlacesClient {
    /// Create a new Places client
    pub fn new(settings: &PlacesSettings) -> Result<Self, PlacesError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        tracing::debug!(
            "Places client for {} (key {})",
            settings.base_url,
            mask_api_key(&settings.api_key)
        );

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            radius_cap_m: settings.request_radius_cap_m,
            client,
            photos: PhotoUrlBuilder::new(settings),
        })
    }

    pub fn photo_urls(&self) -> &PhotoUrlBuilder {
        &self.photos
    }

    fn nearby_url(&self, query: &NearbyQuery) -> String {
        let radius = query.radius_m.min(self.radius_cap_m).max(1.0).round() as u64;
        let mut url = format!(
            "{}/nearbysearch/json?location={},{}&radius={}&type=restaurant&key={}",
            self.base_url,
            query.location.latitude,
            query.location.longitude,
            radius,
            urlencoding::encode(&self.api_key)
        );
        if let Some(token) = &query.page_token {
            url.push_str("&pagetoken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Fetch price level, type tags and photos for one place
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let url = format!(
            "{}/details/json?place_id={}&fields=photos,price_level,types&key={}",
            self.base_url,
            urlencoding::encode(place_id),
            urlencoding::encode(&self.api_key)
        );

        tracing::debug!("Fetching place details for: {}", place_id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PlacesError::Status(response.status().to_string()));
        }

        let body: DetailsResponse = response
            .json()
            .await
            .map_err(|e| PlacesError::InvalidResponse(e.to_string()))?;

        if body.status != "OK" {
            tracing::warn!(
                "Details for {} returned {}: {}",
                place_id,
                body.status,
                body.error_message.as_deref().unwrap_or("no message")
            );
            return Err(PlacesError::Status(body.status));
        }

        let result = body
            .result
            .ok_or_else(|| PlacesError::InvalidResponse("Missing result object".into()))?;

        Ok(PlaceDetails {
            place_id: place_id.to_string(),
            photos: result.photos,
            price_level: result.price_level,
            types: result.types,
        })
    }

    /// Photo URL for a place, preferring a food shot from the details endpoint
    ///
    /// Falls back to the place's own first photo when details are unavailable.
    pub async fn representative_photo_url(&self, place: &RawPlace) -> Option<String> {
        let photos = match self.place_details(&place.place_id).await {
            Ok(details) if !details.photos.is_empty() => details.photos,
            Ok(_) => place.photos.clone(),
            Err(e) => {
                tracing::warn!("Place details failed for {}: {}", place.place_id, e);
                place.photos.clone()
            }
        };

        pick_food_photo(&photos).map(|photo| self.photos.url(&photo.photo_reference))
    }
}

#[async_trait]
impl PlacesProvider for PlacesClient {
    async fn nearby_search(&self, query: &NearbyQuery) -> Result<NearbyPage, PlacesError> {
        let url = self.nearby_url(query);
        tracing::debug!(
            "Nearby search at {} (radius {:.0}m, page token: {})",
            query.location,
            query.radius_m.min(self.radius_cap_m),
            query.page_token.is_some()
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PlacesError::Status(response.status().to_string()));
        }

        let body: NearbySearchResponse = response
            .json()
            .await
            .map_err(|e| PlacesError::InvalidResponse(e.to_string()))?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(NearbyPage::default()),
            _ => {
                tracing::warn!(
                    "Places API status {}: {}",
                    body.status,
                    body.error_message.as_deref().unwrap_or("no message")
                );
                return Err(PlacesError::Status(body.status));
            }
        }

        let results = body
            .results
            .into_iter()
            .filter_map(PlaceResult::into_raw_place)
            .collect();

        Ok(NearbyPage {
            results,
            next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

/// Builds photo URLs without fetching them
#[derive(Debug, Clone)]
pub struct PhotoUrlBuilder {
    base_url: String,
    api_key: String,
    max_width: u32,
}

impl PhotoUrlBuilder {
    pub fn new(settings: &PlacesSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            max_width: settings.photo_max_width,
        }
    }

    pub fn url(&self, photo_reference: &str) -> String {
        self.url_with_width(photo_reference, self.max_width)
    }

    pub fn url_with_width(&self, photo_reference: &str, max_width: u32) -> String {
        format!(
            "{}/photo?maxwidth={}&photo_reference={}&key={}",
            self.base_url,
            max_width,
            urlencoding::encode(photo_reference),
            urlencoding::encode(&self.api_key)
        )
    }

    /// URL of the place's first photo, if it has any
    pub fn first_photo_url(&self, place: &RawPlace) -> Option<String> {
        place.photos.first().map(|p| self.url(&p.photo_reference))
    }

    /// Card view of a restaurant, showing its first photo
    pub fn card(&self, restaurant: &CategorizedRestaurant) -> Restaurant {
        Restaurant::from_categorized(restaurant, self.first_photo_url(&restaurant.place))
    }
}

/// Pick the first photo whose attribution mentions food, else the first photo
pub fn pick_food_photo(photos: &[PlacePhoto]) -> Option<&PlacePhoto> {
    photos
        .iter()
        .find(|photo| {
            photo.html_attributions.iter().any(|attribution| {
                let text = attribution.to_lowercase();
                FOOD_PHOTO_KEYWORDS.iter().any(|k| text.contains(k))
            })
        })
        .or_else(|| photos.first())
}

/// Mask an API key for logs, keeping the first five characters
pub fn mask_api_key(key: &str) -> String {
    let hidden = key.chars().count().saturating_sub(5);
    if hidden == 0 {
        return key.to_string();
    }
    let visible: String = key.chars().take(5).collect();
    format!("{}{}", visible, "*".repeat(hidden))
}
