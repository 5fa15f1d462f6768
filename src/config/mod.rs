//! Engine configuration.
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `STOKVEL` prefix with
//! `__` separating nested values:
//!
//! - `STOKVEL__ENGINE__COOLDOWN_DAYS=7`
//! - `STOKVEL__DATABASE__URL=postgres://...`

use serde::Deserialize;
use thiserror::Error;

/// Failure loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration for the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Join-request policy knobs.
    #[serde(default)]
    pub engine: EngineConfig,

    /// PostgreSQL connection settings. Optional: deployments using the
    /// in-memory adapters run without a database.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Policy knobs for the join-request workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Days a rejected user must wait before requesting again.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,

    /// Rejections after which a user may never request to join again.
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: u32,
}

fn default_cooldown_days() -> u32 {
    7
}

fn default_ban_threshold() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_days: default_cooldown_days(),
            ban_threshold: default_ban_threshold(),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl AppConfig {
    /// Loads configuration from the environment, reading `.env` first when
    /// present.
    ///
    /// # Errors
    ///
    /// `ConfigError::Load` when a variable fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("STOKVEL").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation of loaded values.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.ban_threshold == 0 {
            return Err(ConfigError::Invalid(
                "engine.ban_threshold must be at least 1".to_string(),
            ));
        }
        if let Some(database) = &self.database {
            if !database.url.starts_with("postgres://") && !database.url.starts_with("postgresql://")
            {
                return Err(ConfigError::Invalid(
                    "database.url must be a postgres:// URL".to_string(),
                ));
            }
            if database.max_connections == 0 {
                return Err(ConfigError::Invalid(
                    "database.max_connections must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
