//! Fixed names shared by the delivery, activation and CLI layers
//!
//! Module and entry point names are part of the packaged application, so they
//! are defaults here rather than free-form settings.

/// Installable module that carries the player statistics screen
pub const FEATURE_PLAYER_MODULE: &str = "feature_player";

/// Entry point opened once the statistics module is present
pub const PLAYER_STATS_ENTRY_POINT: &str = "com.devansh.crikstats.feature_player.PlayerStatsActivity";

/// Default capacity of the per-session state queue
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Directory name used under the platform config and data directories
pub const APP_DIR: &str = "crikstats";

pub const ENV_OUTPUT: &str = "CRIKSTATS_OUTPUT";
pub const ENV_COLOR: &str = "CRIKSTATS_COLOR";
pub const ENV_EVENT_BUFFER: &str = "CRIKSTATS_EVENT_BUFFER";
pub const ENV_FEATURE_MODULE: &str = "CRIKSTATS_FEATURE_MODULE";
