//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Posting and matching engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Engine configuration shared by posting, recurring and matching jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Invoice-level variance percentage accepted by three-way matching.
    #[serde(default = "default_tolerance_percentage")]
    pub default_tolerance_percentage: Decimal,
    /// Absolute unit-price difference ignored by three-way matching.
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: Decimal,
    /// Prefix used by the sequential journal entry numbering.
    #[serde(default = "default_entry_number_prefix")]
    pub entry_number_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_tolerance_percentage: default_tolerance_percentage(),
            price_tolerance: default_price_tolerance(),
            entry_number_prefix: default_entry_number_prefix(),
        }
    }
}

fn default_tolerance_percentage() -> Decimal {
    Decimal::new(5, 0)
}

fn default_price_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_entry_number_prefix() -> String {
    "JE".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
