use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::ScoringPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Remote embedding backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Whether the backend exposes a joint image/text embedding space
    #[serde(default = "default_supports_text")]
    pub supports_text: bool,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "clip-vit-b32".to_string()
}
fn default_supports_text() -> bool {
    true
}
fn default_backend_timeout() -> u64 {
    30
}

/// Tunables of the physical scoring blend
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_ref_max_weight")]
    pub ref_max_weight: f64,
    #[serde(default = "default_ref_mean_weight")]
    pub ref_mean_weight: f64,
    #[serde(default = "default_example_similarity_bar")]
    pub example_similarity_bar: f64,
    #[serde(default = "default_positive_blend")]
    pub positive_blend: f64,
    #[serde(default = "default_negative_damp")]
    pub negative_damp: f64,
}

impl ScoringSettings {
    pub fn policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            ref_max_weight: self.ref_max_weight,
            ref_mean_weight: self.ref_mean_weight,
            example_similarity_bar: self.example_similarity_bar,
            positive_blend: self.positive_blend,
            negative_damp: self.negative_damp,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            ref_max_weight: default_ref_max_weight(),
            ref_mean_weight: default_ref_mean_weight(),
            example_similarity_bar: default_example_similarity_bar(),
            positive_blend: default_positive_blend(),
            negative_damp: default_negative_damp(),
        }
    }
}

fn default_ref_max_weight() -> f64 { 0.7 }
fn default_ref_mean_weight() -> f64 { 0.3 }
fn default_example_similarity_bar() -> f64 { 0.65 }
fn default_positive_blend() -> f64 { 0.4 }
fn default_negative_damp() -> f64 { 0.7 }

/// Batch pipeline settings
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Delay between batch items so interactive calls are not starved
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

fn default_item_delay_ms() -> u64 { 500 }

/// Embedding cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 { 1000 }
fn default_cache_ttl() -> u64 { 3600 }

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
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with MATCHLENS_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. MATCHLENS__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("MATCHLENS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // The conventional DATABASE_URL wins over everything else
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MATCHLENS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
