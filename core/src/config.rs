//! Configuration loading
//!
//! Sources, later ones win:
//! 1. Built-in defaults
//! 2. `fetchflow.toml` in the working directory (or the path given with `--config`)
//! 3. `FETCHFLOW_*` environment variables, `__` separating sections
//!    (`FETCHFLOW_ENGINE__SUSPEND_FUNCTION=http_get`)
//!
//! A `.env` file is loaded into the process environment first.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_NAME: &str = "fetchflow";
const ENV_PREFIX: &str = "FETCHFLOW";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Settings for a VM instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of the call that suspends execution (`fetch(...)`)
    pub suspend_function: String,

    /// Id given to the first continuation of a VM
    pub first_continuation_id: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suspend_function: "fetch".to_string(),
            first_continuation_id: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with the default search path
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.engine.suspend_function;
        let mut chars = name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if !valid {
            bail!("engine.suspend_function must be an identifier, got {:?}", name);
        }
        if self.engine.first_continuation_id == 0 {
            bail!("engine.first_continuation_id must be at least 1");
        }
        Ok(())
    }
}

/// Builder for `Config`
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Use this file instead of searching for `fetchflow.toml` (the file must exist)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Ignore `.env` and `FETCHFLOW_*` variables
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config> {
        let defaults = EngineConfig::default();

        let mut builder = config::Config::builder()
            .set_default("engine.suspend_function", defaults.suspend_function)?
            .set_default(
                "engine.first_continuation_id",
                defaults.first_continuation_id as i64,
            )?
            .set_default("logging.level", LoggingConfig::default().level)?;

        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        if !self.skip_env {
            dotenvy::dotenv().ok();
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        let config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }
}
