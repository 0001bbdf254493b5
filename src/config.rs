use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub places: PlacesSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_radius_cap")]
    pub request_radius_cap_m: f64,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_max_results_per_area")]
    pub max_results_per_area: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_photo_max_width")]
    pub photo_max_width: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            base_url: default_places_base_url(),
            api_key: String::new(),
            request_radius_cap_m: default_request_radius_cap(),
            page_delay_ms: default_page_delay_ms(),
            max_results_per_area: default_max_results_per_area(),
            max_pages: default_max_pages(),
            photo_max_width: default_photo_max_width(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PlacesSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

fn default_places_base_url() -> String { "https://maps.googleapis.com/maps/api/place".to_string() }
fn default_request_radius_cap() -> f64 { 50_000.0 }
fn default_page_delay_ms() -> u64 { 2000 }
fn default_max_results_per_area() -> usize { 60 }
fn default_max_pages() -> usize { 3 }
fn default_photo_max_width() -> u32 { 400 }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_temperature(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

fn default_llm_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_llm_model() -> String { "gpt-4".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_batch_size() -> usize { 20 }
fn default_batch_delay_ms() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_sub_radius")]
    pub sub_radius_m: f64,
    #[serde(default = "default_min_radius")]
    pub min_radius_m: f64,
    #[serde(default = "default_max_radius")]
    pub max_radius_m: f64,
    #[serde(default = "default_radius")]
    pub default_radius_m: f64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            sub_radius_m: default_sub_radius(),
            min_radius_m: default_min_radius(),
            max_radius_m: default_max_radius(),
            default_radius_m: default_radius(),
        }
    }
}

fn default_sub_radius() -> f64 { 35_000.0 }
fn default_min_radius() -> f64 { 800.0 }
fn default_max_radius() -> f64 { 50_000.0 }
fn default_radius() -> f64 { 1500.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PLATEPICK__)
    /// 5. Provider keys from GOOGLE_PLACES_API_KEY / OPENAI_API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PLATEPICK__PLACES__API_KEY -> places.api_key
            .add_source(
                Environment::with_prefix("PLATEPICK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_provider_keys(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    ///
    /// Same layering as [`Settings::load`] with `path` in place of the
    /// `config/` files.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PLATEPICK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_provider_keys(settings)?;

        settings.try_deserialize()
    }
}

/// Let the conventional provider key variables override configured keys
fn apply_provider_keys(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let places_key = env::var("GOOGLE_PLACES_API_KEY").ok();
    let openai_key = env::var("OPENAI_API_KEY").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(key) = places_key {
        builder = builder.set_override("places.api_key", key)?;
    }
    if let Some(key) = openai_key {
        builder = builder.set_override("llm.api_key", key)?;
    }

    builder.build()
}
