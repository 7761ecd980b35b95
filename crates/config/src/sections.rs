//! Configuration sections for output, delivery and activation

use crate::constants::{DEFAULT_EVENT_BUFFER, FEATURE_PLAYER_MODULE, PLAYER_STATS_ENTRY_POINT};
use crikstats_types::{ColorChoice, ModuleId, OutputFormat};
use serde::{Deserialize, Serialize};

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

/// Module delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Capacity of the bounded queue between a listener and its consumer
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Module that carries the statistics capability
    #[serde(default = "default_feature_module")]
    pub feature_module: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            feature_module: FEATURE_PLAYER_MODULE.to_string(),
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub fn feature_module_id(&self) -> ModuleId {
        ModuleId::new(self.feature_module.clone())
    }
}

/// Activation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// Entry point entered once the module is installed
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            entry_point: PLAYER_STATS_ENTRY_POINT.to_string(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

fn default_feature_module() -> String {
    FEATURE_PLAYER_MODULE.to_string()
}

fn default_entry_point() -> String {
    PLAYER_STATS_ENTRY_POINT.to_string()
}
