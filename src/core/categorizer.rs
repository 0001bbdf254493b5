use async_trait::async_trait;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

use crate::models::{CuisineLabel, RawPlace, FALLBACK_CUISINE};

/// Maps places to cuisine labels
///
/// Implementations must label every place they are given.
#[async_trait]
pub trait CuisineCategorizer: Send + Sync {
    /// Label every place, keyed by place id
    async fn categorize_batch(&self, places: &[RawPlace]) -> HashMap<String, CuisineLabel>;

    async fn categorize(&self, place: &RawPlace) -> CuisineLabel {
        self.categorize_batch(std::slice::from_ref(place))
            .await
            .remove(&place.place_id)
            .unwrap_or_else(|| FALLBACK_CUISINE.to_string())
    }

    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;
}

/// One row of the heuristic table
#[derive(Debug, Clone, PartialEq)]
pub struct CuisineCategory {
    pub name: String,
    /// Lower-cased substrings matched against name and vicinity
    pub keywords: Vec<String>,
    /// Provider type tags that map directly to this cuisine
    pub type_tags: Vec<String>,
}

impl CuisineCategory {
    pub fn new(name: &str, keywords: &[&str], type_tags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            type_tags: type_tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

type CategoryRow = (&'static str, &'static [&'static str], &'static [&'static str]);

const DEFAULT_CATEGORIES: &[CategoryRow] = &[
    (
        "Italian",
        &["italian", "pizza", "pasta", "risotto", "trattoria", "osteria", "ristorante", "pizzeria"],
        &["italian_restaurant", "pizza_restaurant"],
    ),
    (
        "Mexican",
        &["mexican", "taco", "burrito", "enchilada", "tortilla", "taqueria", "cantina", "quesadilla", "fajita"],
        &["mexican_restaurant", "taco_restaurant"],
    ),
    (
        "Chinese",
        &["chinese", "dim sum", "szechuan", "sichuan", "hunan", "canton", "wok", "noodle", "panda", "dragon"],
        &["chinese_restaurant", "asian_restaurant"],
    ),
    (
        "Japanese",
        &["japanese", "sushi", "ramen", "tempura", "udon", "izakaya", "teriyaki", "bento", "tokyo"],
        &["japanese_restaurant", "sushi_restaurant"],
    ),
    (
        "Thai",
        &["thai", "pad thai", "curry", "bangkok", "basil", "thailand"],
        &["thai_restaurant"],
    ),
    (
        "Indian",
        &["indian", "curry", "tandoori", "masala", "biryani", "tikka", "punjabi", "delhi", "bombay"],
        &["indian_restaurant"],
    ),
    (
        "American",
        &["american", "burger", "steak", "bbq", "grill", "diner", "wings", "fries", "hot dog", "sandwich"],
        &["american_restaurant", "burger_restaurant", "steak_house", "diner"],
    ),
    (
        "Mediterranean",
        &["mediterranean", "greek", "turkish", "hummus", "falafel", "kebab", "shawarma", "gyro", "pita"],
        &["mediterranean_restaurant", "greek_restaurant", "turkish_restaurant", "middle_eastern_restaurant"],
    ),
    (
        "Vietnamese",
        &["vietnamese", "pho", "banh mi", "spring roll", "vietnam"],
        &["vietnamese_restaurant"],
    ),
    (
        "Korean",
        &["korean", "bibimbap", "bulgogi", "kimchi", "seoul", "korea", "kbbq"],
        &["korean_restaurant"],
    ),
    (
        "Fast Food",
        &["mcdonalds", "burger king", "wendys", "fast food", "drive-thru", "drive thru", "fries"],
        &["fast_food_restaurant", "meal_takeaway"],
    ),
    (
        "Seafood",
        &["seafood", "fish", "sushi", "lobster", "crab", "shrimp", "oyster"],
        &["seafood_restaurant"],
    ),
    (
        "BBQ",
        &["bbq", "barbecue", "barbeque", "smokehouse", "smoked", "grill"],
        &["bbq_restaurant"],
    ),
    (
        "Breakfast",
        &["breakfast", "brunch", "pancake", "waffle", "diner", "cafe", "coffee"],
        &["breakfast_restaurant", "cafe"],
    ),
    (
        "Bar & Grill",
        &["bar", "pub", "tavern", "sports bar", "brewery", "ale house"],
        &["bar", "pub", "sports_bar"],
    ),
    (
        "Asian Fusion",
        &["fusion", "asian fusion", "pan asian", "modern asian"],
        &["asian_fusion_restaurant", "asian_restaurant"],
    ),
];

/// Minimum length of a name token considered for partial matching
const PARTIAL_MATCH_MIN_CHARS: usize = 4;

/// Which rule produced a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    TypeTag,
    Keyword,
    PartialWord,
    Fallback,
}

/// Deterministic rule-based categorizer
///
/// Resolution order, first match wins:
/// 1. a place type tag listed by a category
/// 2. a category keyword inside `name + " " + vicinity`
/// 3. for generic `restaurant`/`food` places, a name token (4+ chars) that
///    contains or is contained in a keyword
/// 4. [`FALLBACK_CUISINE`]
#[derive(Debug, Clone)]
pub struct HeuristicCategorizer {
    categories: Vec<CuisineCategory>,
}

impl HeuristicCategorizer {
    pub fn new() -> Self {
        Self::with_categories(
            DEFAULT_CATEGORIES
                .iter()
                .map(|(name, keywords, tags)| CuisineCategory::new(name, keywords, tags))
                .collect(),
        )
    }

    pub fn with_categories(categories: Vec<CuisineCategory>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &[CuisineCategory] {
        &self.categories
    }

    /// Label a single place
    pub fn classify(&self, place: &RawPlace) -> &str {
        self.classify_with_rule(place).0
    }

    /// Label a single place and report which rule matched
    pub fn classify_with_rule(&self, place: &RawPlace) -> (&str, MatchRule) {
        if place.name.trim().is_empty() {
            return (FALLBACK_CUISINE, MatchRule::Fallback);
        }

        let name = place.name.to_lowercase();
        let types: Vec<String> = place.types.iter().map(|t| t.to_lowercase()).collect();

        if let Some(category) = self
            .categories
            .iter()
            .find(|c| c.type_tags.iter().any(|tag| types.contains(tag)))
        {
            return (category.name.as_str(), MatchRule::TypeTag);
        }

        let search_text = format!("{} {}", name, place.vicinity.to_lowercase());
        if let Some(category) = self
            .categories
            .iter()
            .find(|c| c.keywords.iter().any(|k| search_text.contains(k.as_str())))
        {
            return (category.name.as_str(), MatchRule::Keyword);
        }

        let generic = types.iter().any(|t| t == "restaurant" || t == "food");
        if generic {
            let words: Vec<&str> = name
                .split_whitespace()
                .filter(|w| w.chars().count() >= PARTIAL_MATCH_MIN_CHARS)
                .collect();

            if let Some(category) = self.categories.iter().find(|c| {
                words.iter().any(|word| {
                    c.keywords
                        .iter()
                        .any(|k| k.contains(word) || word.contains(k.as_str()))
                })
            }) {
                return (category.name.as_str(), MatchRule::PartialWord);
            }
        }

        (FALLBACK_CUISINE, MatchRule::Fallback)
    }

    /// Label a batch synchronously
    pub fn classify_batch(&self, places: &[RawPlace]) -> HashMap<String, CuisineLabel> {
        let labels: HashMap<String, CuisineLabel> = places
            .iter()
            .map(|p| (p.place_id.clone(), self.classify(p).to_string()))
            .collect();

        tracing::info!("Category distribution: {:?}", distribution(labels.values()));
        labels
    }

    /// Up to `count` distinct category names picked at random
    pub fn random_categories<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<CuisineLabel> {
        let amount = count.min(self.categories.len());
        rand::seq::index::sample(rng, self.categories.len(), amount)
            .into_iter()
            .map(|i| self.categories[i].name.clone())
            .collect()
    }
}

impl Default for HeuristicCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CuisineCategorizer for HeuristicCategorizer {
    async fn categorize_batch(&self, places: &[RawPlace]) -> HashMap<String, CuisineLabel> {
        self.classify_batch(places)
    }

    async fn categorize(&self, place: &RawPlace) -> CuisineLabel {
        self.classify(place).to_string()
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Count labels per cuisine
pub fn distribution<'a, I>(labels: I) -> BTreeMap<CuisineLabel, usize>
where
    I: IntoIterator<Item = &'a CuisineLabel>,
{
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}
