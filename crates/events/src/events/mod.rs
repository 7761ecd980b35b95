use serde::{Deserialize, Serialize};

use crate::EventSource;
use crikstats_types::InstallState;

// Declare all domain modules
pub mod activation;
pub mod general;
pub mod install;

// Re-export all domain events
pub use activation::*;
pub use general::*;
pub use install::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings)
    General(GeneralEvent),

    /// Module install sequence events
    Install(InstallEvent),

    /// Capability hand-off events
    Activation(ActivationEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Install(_) => EventSource::INSTALL,
            Self::Activation(_) => EventSource::ACTIVATION,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::Install(
                InstallEvent::SubmissionFailed { .. }
                | InstallEvent::StateChanged {
                    state: InstallState::Failed { .. },
                    ..
                },
            )
            | Self::Activation(ActivationEvent::Failed { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Install(InstallEvent::StateChanged {
                state: InstallState::Canceled,
                ..
            }) => Level::WARN,

            // Debug-level events (progress updates, listener lifecycle)
            Self::Install(
                InstallEvent::StateChanged {
                    state: InstallState::Downloading { .. },
                    ..
                }
                | InstallEvent::ListenerRegistered { .. }
                | InstallEvent::ListenerReleased { .. },
            )
            | Self::Activation(ActivationEvent::OutputCleared) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "crikstats::events::general",
            Self::Install(_) => "crikstats::events::install",
            Self::Activation(_) => "crikstats::events::activation",
        }
    }

    /// Get structured fields for logging
    #[must_use]
    pub fn log_fields(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
