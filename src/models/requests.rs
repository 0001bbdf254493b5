use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::distance::{MAX_SEARCH_RADIUS_M, MIN_SEARCH_RADIUS_M, RADIUS_STEP_M};
use crate::models::domain::{GeoPoint, PriceLevel};

/// Search radius in meters, kept within the slider bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRadius(f64);

impl SearchRadius {
    /// Clamp `meters` into `[min, max]`
    pub fn clamped(meters: f64, min: f64, max: f64) -> Self {
        let meters = if meters.is_nan() { min } else { meters };
        Self(meters.clamp(min, max))
    }

    pub fn new(meters: f64) -> Self {
        Self::clamped(meters, MIN_SEARCH_RADIUS_M, MAX_SEARCH_RADIUS_M)
    }

    pub fn meters(self) -> f64 {
        self.0
    }

    /// One slider notch (about a mile) wider
    pub fn step_up(self) -> Self {
        Self::new(self.0 + RADIUS_STEP_M)
    }

    /// One slider notch narrower
    pub fn step_down(self) -> Self {
        Self::new(self.0 - RADIUS_STEP_M)
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(1500.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct Coordinates {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl From<GeoPoint> for Coordinates {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

impl From<Coordinates> for GeoPoint {
    fn from(value: Coordinates) -> Self {
        GeoPoint::new(value.latitude, value.longitude)
    }
}

/// Request to run one discovery pass
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiscoveryRequest {
    #[validate(nested)]
    pub center: Coordinates,
    #[validate(range(min = 800.0, max = 50000.0))]
    #[serde(alias = "radius_m", rename = "radiusM")]
    pub radius_m: f64,
    #[validate(range(min = 1, max = 4))]
    #[serde(alias = "price_level", rename = "priceLevel", default)]
    pub price_level: Option<u8>,
}

impl DiscoveryRequest {
    pub fn new(center: GeoPoint, radius: SearchRadius, price_level: Option<PriceLevel>) -> Self {
        Self {
            center: center.into(),
            radius_m: radius.meters(),
            price_level: price_level.map(PriceLevel::value),
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.center.into()
    }

    pub fn price(&self) -> Option<PriceLevel> {
        self.price_level.and_then(PriceLevel::new)
    }
}
