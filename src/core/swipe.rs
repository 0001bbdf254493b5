use serde::Serialize;

use crate::models::CategorizedRestaurant;

/// Like/skip pass over the restaurants of the winning cuisine
#[derive(Debug, Clone, Serialize)]
pub struct SwipeSession {
    cuisine: String,
    restaurants: Vec<CategorizedRestaurant>,
    current_index: usize,
    liked: Vec<CategorizedRestaurant>,
}

impl SwipeSession {
    /// Keep only `cuisine` restaurants, preserving their order
    pub fn new<'a, I>(cuisine: &str, restaurants: I) -> Self
    where
        I: IntoIterator<Item = &'a CategorizedRestaurant>,
    {
        let restaurants: Vec<CategorizedRestaurant> = restaurants
            .into_iter()
            .filter(|r| r.cuisine_category == cuisine)
            .cloned()
            .collect();

        tracing::debug!("{} restaurant(s) to swipe for {}", restaurants.len(), cuisine);

        Self {
            cuisine: cuisine.to_string(),
            restaurants,
            current_index: 0,
            liked: Vec::new(),
        }
    }

    pub fn cuisine(&self) -> &str {
        &self.cuisine
    }

    pub fn restaurants(&self) -> &[CategorizedRestaurant] {
        &self.restaurants
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&CategorizedRestaurant> {
        self.restaurants.get(self.current_index)
    }

    pub fn liked(&self) -> &[CategorizedRestaurant] {
        &self.liked
    }

    pub fn into_liked(self) -> Vec<CategorizedRestaurant> {
        self.liked
    }

    pub fn remaining(&self) -> usize {
        self.restaurants.len().saturating_sub(self.current_index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.restaurants.len()
    }

    /// Pass on the current restaurant
    pub fn skip(&mut self) {
        self.current_index += 1;
    }

    /// Keep the current restaurant and move on
    pub fn like(&mut self) {
        if let Some(restaurant) = self.restaurants.get(self.current_index) {
            self.liked.push(restaurant.clone());
        }
        self.current_index += 1;
    }
}
