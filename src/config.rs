//! Database configuration
//!
//! Settings are read from `config/config.toml` (optional) and then from environment
//! variables prefixed with `TIDEWATER__`, e.g. `TIDEWATER__DATABASE__PATH=app.db`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "TIDEWATER";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:`
    #[serde(default = "default_path")]
    pub path: String,
    /// Wrap each mutating statement in its own transaction
    #[serde(default = "default_true")]
    pub transactional: bool,
    /// Use the backend's generated keys on insert
    #[serde(default = "default_true")]
    pub insert_get_id: bool,
    /// Register a [`LogListener`](crate::LogListener) on connect
    #[serde(default)]
    pub log_queries: bool,
}

fn default_path() -> String {
    "tidewater.db".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            transactional: true,
            insert_get_id: true,
            log_queries: false,
        }
    }
}

impl DatabaseConfig {
    /// Load the database configuration from `config/config.toml`, falling back to env vars.
    ///
    /// A missing `database` section yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the environment cannot be read or the section does not
    /// deserialize.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Same as [`load`](Self::load) with an explicit file path
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the environment cannot be read or the section does not
    /// deserialize.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // Unreadable file: retry with env only
                log::warn!("failed to load config file {file}, falling back to env: {err}");
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        match settings.get::<DatabaseConfig>("database") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }
}
