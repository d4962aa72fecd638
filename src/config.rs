//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use std::time::Duration;

/// Dashboard password used when `DASHBOARD_PASSWORD` is not set.
///
/// Only meant for local development; startup logs a warning when it is in effect.
pub const DEFAULT_DASHBOARD_PASSWORD: &str = "admin123";

/// Which persistence backend holds the `keys` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL accessed directly through sqlx.
    Postgres,
    /// Supabase / PostgREST accessed over HTTP.
    Rest,
    /// Process-local map, lost on restart.
    Memory,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `KEY_STORE` (optional): `postgres` (default), `rest` or `memory`
/// - `DATABASE_URL`: PostgreSQL connection string, required for `postgres`
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `SUPABASE_URL` / `SUPABASE_SERVICE_KEY`: required for `rest`
/// - `DASHBOARD_PASSWORD` (optional): shared secret for management endpoints
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `STORE_TIMEOUT_SECS` (optional): per-call store timeout, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_key_store")]
    pub key_store: StoreBackend,

    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    pub supabase_url: Option<String>,

    pub supabase_service_key: Option<String>,

    #[serde(default = "default_dashboard_password")]
    pub dashboard_password: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_store_timeout_secs")]
    pub store_timeout_secs: u64,
}

fn default_key_store() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_max_connections() -> u32 {
    5
}

fn default_dashboard_password() -> String {
    DEFAULT_DASHBOARD_PASSWORD.to_string()
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_store_timeout_secs() -> u64 {
    10
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{0} must be set when KEY_STORE={1}")]
    Missing(&'static str, &'static str),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment variable values cannot be parsed into expected types
    /// - The credentials required by the selected `KEY_STORE` are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected backend has everything it needs to connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.key_store {
            StoreBackend::Postgres if self.database_url.is_none() => {
                Err(ConfigError::Missing("DATABASE_URL", "postgres"))
            }
            StoreBackend::Rest if self.supabase_url.is_none() => {
                Err(ConfigError::Missing("SUPABASE_URL", "rest"))
            }
            StoreBackend::Rest if self.supabase_service_key.is_none() => {
                Err(ConfigError::Missing("SUPABASE_SERVICE_KEY", "rest"))
            }
            _ => Ok(()),
        }
    }

    /// Timeout applied to every call against the key store.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// True when the management secret was never overridden.
    pub fn uses_default_password(&self) -> bool {
        self.dashboard_password == DEFAULT_DASHBOARD_PASSWORD
    }
}
