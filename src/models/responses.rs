use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::tournament::Tournament;
use crate::models::domain::{CategorizedRestaurant, CuisineLabel};

/// Result of a successful discovery run
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryOutcome {
    pub run_id: uuid::Uuid,
    /// Categorized restaurants, fallback bucket removed, grid order kept
    pub restaurants: Vec<CategorizedRestaurant>,
    /// Distinct cuisines in first-seen order
    #[serde(rename = "availableCuisines")]
    pub available_cuisines: Vec<CuisineLabel>,
    /// Unique places found before price filtering
    #[serde(rename = "totalPlaces")]
    pub total_places: usize,
    pub distribution: BTreeMap<CuisineLabel, usize>,
    /// Opening state of the cuisine tournament
    pub tournament: Tournament,
}

impl DiscoveryOutcome {
    pub fn restaurants_for<'a>(
        &'a self,
        cuisine: &'a str,
    ) -> impl Iterator<Item = &'a CategorizedRestaurant> + 'a {
        self.restaurants
            .iter()
            .filter(move |r| r.cuisine_category == cuisine)
    }
}
