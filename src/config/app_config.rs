use serde::{Deserialize, Serialize};

use crate::domain::cache_control::{CacheControl, CacheControlAge, CacheMode};
use crate::domain::DomainError;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Cache tier selection and the policy applied when callers bring none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache tier backend: `memory`, `moka` or `redis`
    pub store: String,
    pub default_mode: CacheMode,
    /// Seconds
    pub default_max_age: u64,
    /// Share concurrent origin fetches for the same key
    pub coalesce: bool,
    pub moka_capacity: u64,
    pub redis_url: String,
    pub key_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            store: "memory".to_string(),
            default_mode: CacheMode::default(),
            default_max_age: CacheControlAge::Hour.as_secs(),
            coalesce: false,
            moka_capacity: 10_000,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl CacheSettings {
    /// Builds the configured default policy for `subject_id`
    pub fn default_policy(&self, subject_id: impl Into<String>) -> Result<CacheControl, DomainError> {
        CacheControl::with_mode(self.default_mode, self.default_max_age, subject_id)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
