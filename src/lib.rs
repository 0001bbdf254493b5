//! Platepick - restaurant discovery and cuisine tournaments
//!
//! This library finds restaurants around a point with a grid of Places
//! searches, labels each one with a cuisine, and lets a user narrow the
//! cuisines down head-to-head before swiping through the winner's venues.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use crate::core::{
    distance::{build_search_grid, haversine_distance},
    Discovery, GameSession, GameStage, Tournament,
};
pub use error::DiscoveryError;
pub use models::{CategorizedRestaurant, DiscoveryOutcome, DiscoveryRequest, GeoPoint, PriceLevel, RawPlace};
