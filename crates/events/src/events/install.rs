use crikstats_types::{InstallState, ModuleId};
use serde::{Deserialize, Serialize};

/// Install domain events - emitted by the feature module installer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstallEvent {
    /// Module already present when the sequence started; nothing was requested
    AlreadyInstalled { module: ModuleId },

    /// Listener registered with the delivery service for one install sequence
    ListenerRegistered { module: ModuleId, listener_id: u64 },

    /// Install request handed to the delivery service
    Requested { module: ModuleId },

    /// Install request could not be submitted
    SubmissionFailed { module: ModuleId, reason: String },

    /// Translated state forwarded to the consumer
    StateChanged {
        module: ModuleId,
        state: InstallState,
    },

    /// Listener released; the sequence is over
    ListenerReleased { module: ModuleId, listener_id: u64 },

    /// Deferred removal requested
    UninstallRequested { module: ModuleId },
}

impl InstallEvent {
    /// Module the event is about
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        match self {
            Self::AlreadyInstalled { module }
            | Self::ListenerRegistered { module, .. }
            | Self::Requested { module }
            | Self::SubmissionFailed { module, .. }
            | Self::StateChanged { module, .. }
            | Self::ListenerReleased { module, .. }
            | Self::UninstallRequested { module } => module,
        }
    }
}
