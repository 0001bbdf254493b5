use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmSettings;
use crate::core::categorizer::CuisineCategorizer;
use crate::models::{CuisineLabel, RawPlace, FALLBACK_CUISINE};
use crate::services::places::mask_api_key;

/// Cuisine labels the model is allowed to answer with
pub const LLM_CUISINES: &[&str] = &[
    // Asian
    "Chinese", "Japanese", "Thai", "Vietnamese", "Korean", "Indian", "Sushi", "Ramen",
    "Dim Sum", "Asian Fusion",
    // European
    "Italian", "French", "Mediterranean", "Greek", "Spanish", "German", "British", "Pizza",
    "European",
    // American
    "American", "Southern", "Tex-Mex", "Cajun", "Soul Food", "BBQ", "Steakhouse", "Burgers",
    "Hot Dogs",
    // Latin
    "Mexican", "Brazilian", "Peruvian", "Cuban", "Caribbean", "Latin American",
    // Middle Eastern
    "Middle Eastern", "Turkish", "Lebanese", "Persian", "Falafel", "Kebab",
    // Other
    "Seafood", "Vegetarian", "Vegan", "Breakfast", "Brunch", "Cafe", "Deli", "Sandwich",
    "Fast Food", "Food Court", "Buffet", "Fine Dining", "Pub Food", "Wings", "Noodles",
    "Healthy", "Salad", "Ice Cream", "Dessert", "Coffee Shop",
];

const SYSTEM_PROMPT: &str = "You are a restaurant categorization expert. \
Assign each restaurant exactly one cuisine from the provided list.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion API error: {0}")]
    Api(String),

    #[error("Completion response had no content")]
    EmptyResponse,

    #[error("LLM categorization is disabled or has no API key")]
    Disabled,
}

/// Text completion capability: system and user prompt in, reply text out
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: Client,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        if settings.api_key.is_empty() {
            return Err(LlmError::Disabled);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        tracing::debug!(
            "Completion client for {} using {} (key {})",
            settings.base_url,
            settings.model,
            mask_api_key(&settings.api_key)
        );

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            client,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Build the user prompt listing `places`, numbered from 1
pub fn build_prompt(places: &[RawPlace], vocabulary: &[String]) -> String {
    let mut prompt = String::from(
        "Categorize each restaurant below into exactly ONE cuisine from this list:\n",
    );
    prompt.push_str(&vocabulary.join(", "));
    prompt.push_str("\n\nRestaurants:\n");

    for (i, place) in places.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} | address: {} | types: {}",
            i + 1,
            place.name,
            if place.vicinity.is_empty() { "unknown" } else { &place.vicinity },
            place.types.join(", ")
        ));
        if let Some(price) = place.price_level {
            prompt.push_str(&format!(" | price level: {}", price));
        }
        if let Some(rating) = place.rating {
            prompt.push_str(&format!(" | rating: {:.1}", rating));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "\nAnswer with one line per restaurant, in the same order, formatted as\n\
         <number>. <Cuisine> - <short reason>\n\
         Use only cuisines from the list.",
    );
    prompt
}

fn numbered_line() -> Option<&'static Regex> {
    static LINE: OnceLock<Option<Regex>> = OnceLock::new();
    LINE.get_or_init(|| Regex::new(r"^\s*(\d+)[.)]\s+(.+?)(?:\s+[-–—:]\s+.*)?$").ok())
        .as_ref()
}

/// Map a free-form label onto the vocabulary, ignoring case and markup
pub fn canonical_label(raw: &str, vocabulary: &[String]) -> Option<CuisineLabel> {
    let cleaned = raw.trim().trim_matches(|c: char| c == '*' || c == '"' || c == '`' || c == '.');
    vocabulary
        .iter()
        .find(|label| label.eq_ignore_ascii_case(cleaned.trim()))
        .cloned()
}

/// Parse a numbered reply into one optional label per place
///
/// Lines are matched by their number, not their position, so preambles and
/// blank lines are ignored. Labels outside the vocabulary come back as `None`.
pub fn parse_numbered_reply(
    reply: &str,
    count: usize,
    vocabulary: &[String],
) -> Vec<Option<CuisineLabel>> {
    let mut labels = vec![None; count];
    let Some(pattern) = numbered_line() else {
        return labels;
    };

    for line in reply.lines() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let Ok(number) = caps[1].parse::<usize>() else {
            continue;
        };
        if number == 0 || number > count || labels[number - 1].is_some() {
            continue;
        }
        labels[number - 1] = canonical_label(&caps[2], vocabulary);
    }

    labels
}

/// Local classification used when the model gives no usable answer
///
/// Longest vocabulary label found in name, vicinity and type tags wins.
/// Without one, restaurants are bucketed by price and type; anything else
/// is treated as a cafe.
pub fn fallback_label(place: &RawPlace, vocabulary: &[String]) -> CuisineLabel {
    let haystack = format!(
        "{} {} {}",
        place.name,
        place.vicinity,
        place.types.join(" ")
    )
    .to_lowercase();

    // max_by_key keeps the last of equal-length matches
    if let Some(label) = vocabulary
        .iter()
        .filter(|label| haystack.contains(&label.to_lowercase()))
        .max_by_key(|label| label.len())
    {
        return label.clone();
    }

    if place.has_type("restaurant") {
        if place.price_level.is_some_and(|p| p >= 3) {
            "Fine Dining".to_string()
        } else if place.has_type("cafe") {
            "Cafe".to_string()
        } else if place.has_type("fast_food") {
            "Fast Food".to_string()
        } else {
            "American".to_string()
        }
    } else {
        "Cafe".to_string()
    }
}

/// Categorizer backed by a language model, with local fallback per place
pub struct LlmCategorizer {
    provider: Arc<dyn CompletionProvider>,
    vocabulary: Vec<String>,
    batch_size: usize,
    batch_delay: Duration,
}

impl LlmCategorizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            vocabulary: LLM_CUISINES.iter().map(|c| c.to_string()).collect(),
            batch_size: settings.batch_size.max(1),
            batch_delay: settings.batch_delay(),
        }
    }

    pub fn with_vocabulary<I, S>(mut self, vocabulary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary = vocabulary.into_iter().map(Into::into).collect();
        self
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    async fn label_batch(&self, batch: &[RawPlace]) -> Vec<CuisineLabel> {
        let prompt = build_prompt(batch, &self.vocabulary);

        let parsed = match self.provider.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => parse_numbered_reply(&reply, batch.len(), &self.vocabulary),
            Err(e) => {
                tracing::warn!("Completion failed for batch of {}: {}, using local fallback", batch.len(), e);
                vec![None; batch.len()]
            }
        };

        batch
            .iter()
            .zip(parsed)
            .map(|(place, label)| match label {
                Some(label) if label != FALLBACK_CUISINE => label,
                _ => fallback_label(place, &self.vocabulary),
            })
            .collect()
    }
}

#[async_trait]
impl CuisineCategorizer for LlmCategorizer {
    async fn categorize_batch(&self, places: &[RawPlace]) -> HashMap<String, CuisineLabel> {
        let mut labels = HashMap::with_capacity(places.len());
        let batches = places.chunks(self.batch_size).count();

        for (index, batch) in places.chunks(self.batch_size).enumerate() {
            tracing::debug!("Categorizing batch {}/{} ({} places)", index + 1, batches, batch.len());

            for (place, label) in batch.iter().zip(self.label_batch(batch).await) {
                labels.insert(place.place_id.clone(), label);
            }

            if index + 1 < batches && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        labels
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
