use crikstats_types::{ActivationOutcome, ModuleId, SubjectId};
use serde::{Deserialize, Serialize};

/// Activation domain events - emitted by the activation coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivationEvent {
    /// Caller asked to reach a capability for a subject
    Requested { subject: SubjectId, module: ModuleId },

    /// Hand-off into the capability succeeded
    Activated { subject: SubjectId, module: ModuleId },

    /// Hand-off into the capability failed after a successful install
    Failed {
        subject: SubjectId,
        module: ModuleId,
        error: String,
    },

    /// The request finished
    Finished {
        subject: SubjectId,
        module: ModuleId,
        outcome: ActivationOutcome,
    },

    /// Published output reset to "none"
    OutputCleared,
}
