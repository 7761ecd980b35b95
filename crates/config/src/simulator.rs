//! Settings for the in-process simulated delivery service

use serde::{Deserialize, Serialize};

/// How the simulated delivery service plays out an install
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Delay between consecutive status reports
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Size reported for every module download
    #[serde(default = "default_total_bytes")]
    pub total_bytes: i64,
    /// Number of DOWNLOADING reports per install
    #[serde(default = "default_download_chunks")]
    pub download_chunks: u32,
    /// Modules reported installed from the start
    #[serde(default)]
    pub preinstalled: Vec<String>,
    /// End every install with FAILED and this provider error code
    #[serde(default)]
    pub fail_with: Option<i32>,
    /// Pause for user confirmation halfway through the download
    #[serde(default)]
    pub require_confirmation: bool,
    /// Refuse install requests at submission time
    #[serde(default)]
    pub reject_submission: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: default_step_delay_ms(),
            total_bytes: default_total_bytes(),
            download_chunks: default_download_chunks(),
            preinstalled: Vec::new(),
            fail_with: None,
            require_confirmation: false,
            reject_submission: false,
        }
    }
}

fn default_step_delay_ms() -> u64 {
    150
}

fn default_total_bytes() -> i64 {
    4 * 1024 * 1024
}

fn default_download_chunks() -> u32 {
    4
}
