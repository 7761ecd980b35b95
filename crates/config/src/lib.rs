#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for crikstats
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/crikstats/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;
pub mod sections;
pub mod simulator;

pub use sections::{ActivationConfig, DeliveryConfig, GeneralConfig};
pub use simulator::SimulatorConfig;

use crikstats_errors::{ConfigError, Error};
use crikstats_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub activation: ActivationConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(constants::APP_DIR).join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var(constants::ENV_OUTPUT) {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: constants::ENV_OUTPUT.to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        if let Ok(color) = std::env::var(constants::ENV_COLOR) {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: constants::ENV_COLOR.to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(buffer) = std::env::var(constants::ENV_EVENT_BUFFER) {
            self.delivery.event_buffer = buffer
                .parse()
                .ok()
                .filter(|capacity: &usize| *capacity > 0)
                .ok_or(ConfigError::InvalidValue {
                    field: constants::ENV_EVENT_BUFFER.to_string(),
                    value: buffer,
                })?;
        }

        if let Ok(module) = std::env::var(constants::ENV_FEATURE_MODULE) {
            if module.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: constants::ENV_FEATURE_MODULE.to_string(),
                    value: module,
                }
                .into());
            }
            self.delivery.feature_module = module;
        }

        Ok(())
    }

    /// Check values serde cannot rule out on its own
    ///
    /// # Errors
    ///
    /// Returns an error for a zero event buffer or an empty module name.
    pub fn validate(&self) -> Result<(), Error> {
        if self.delivery.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "delivery.event_buffer".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.delivery.feature_module.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "feature_module".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Directory for debug log files
    #[must_use]
    pub fn logs_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(constants::APP_DIR)
            .join("logs")
    }
}
