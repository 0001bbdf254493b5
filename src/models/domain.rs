use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when no cuisine could be determined. Never seeds a tournament.
pub const FALLBACK_CUISINE: &str = "Other";

/// A cuisine name drawn from a categorizer vocabulary
pub type CuisineLabel = String;

/// WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Provider price level, 1 (inexpensive) through 4 (very expensive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PriceLevel(u8);

impl PriceLevel {
    pub const ALL: [PriceLevel; 4] = [PriceLevel(1), PriceLevel(2), PriceLevel(3), PriceLevel(4)];

    pub fn new(level: u8) -> Option<Self> {
        (1..=4).contains(&level).then_some(Self(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Inexpensive",
            2 => "Moderate",
            3 => "Expensive",
            _ => "Very Expensive",
        }
    }

    /// `$` repeated once per level
    pub fn symbol(self) -> String {
        "$".repeat(self.0 as usize)
    }
}

impl TryFrom<u8> for PriceLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("price level {} out of range 1-4", value))
    }
}

impl From<PriceLevel> for u8 {
    fn from(value: PriceLevel) -> Self {
        value.0
    }
}

/// Photo reference attached to a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePhoto {
    pub photo_reference: String,
    #[serde(default)]
    pub html_attributions: Vec<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Place record as returned by the places provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    #[serde(rename = "placeId")]
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub photos: Vec<PlacePhoto>,
    #[serde(rename = "priceLevel", default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vicinity: String,
    pub location: GeoPoint,
}

impl RawPlace {
    /// Price level, if the provider value is within 1-4
    pub fn price(&self) -> Option<PriceLevel> {
        self.price_level.and_then(PriceLevel::new)
    }

    pub fn has_type(&self, tag: &str) -> bool {
        self.types.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A place with its assigned cuisine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRestaurant {
    #[serde(flatten)]
    pub place: RawPlace,
    #[serde(rename = "cuisineCategory")]
    pub cuisine_category: CuisineLabel,
}

impl CategorizedRestaurant {
    pub fn new(place: RawPlace, cuisine_category: impl Into<CuisineLabel>) -> Self {
        Self {
            place,
            cuisine_category: cuisine_category.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.place.place_id
    }

    pub fn is_fallback(&self) -> bool {
        self.cuisine_category == FALLBACK_CUISINE
    }
}

/// Card-ready restaurant with a resolved photo URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub rating: Option<f64>,
    #[serde(rename = "priceLevel")]
    pub price_level: Option<PriceLevel>,
    pub types: Vec<String>,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
    pub vicinity: String,
    pub location: GeoPoint,
    #[serde(rename = "cuisineCategory")]
    pub cuisine_category: CuisineLabel,
}

impl Restaurant {
    pub fn from_categorized(restaurant: &CategorizedRestaurant, photo_url: Option<String>) -> Self {
        let place = &restaurant.place;
        Self {
            id: place.place_id.clone(),
            name: place.name.clone(),
            rating: place.rating,
            price_level: place.price(),
            types: place.types.clone(),
            photo_url,
            vicinity: place.vicinity.clone(),
            location: place.location,
            cuisine_category: restaurant.cuisine_category.clone(),
        }
    }
}

/// One bracket matchup between two distinct cuisines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuisineMatch {
    pub first: CuisineLabel,
    pub second: CuisineLabel,
}

impl CuisineMatch {
    pub fn contains(&self, cuisine: &str) -> bool {
        self.first == cuisine || self.second == cuisine
    }
}

impl fmt::Display for CuisineMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.first, self.second)
    }
}
