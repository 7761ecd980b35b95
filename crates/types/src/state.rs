//! Install state vocabulary shared by the installer and the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time status of one install sequence.
///
/// `Installed`, `Failed` and `Canceled` are terminal: once one of them is
/// emitted the sequence delivers nothing further. `RequiresConfirmation` is a
/// side branch that keeps the sequence open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstallState {
    /// Request accepted, not yet downloading
    Pending,
    /// Bytes transferring. Progress is 0..=100 and not guaranteed monotonic.
    Downloading { progress: u8 },
    /// Download complete, applying
    Installing,
    /// Terminal success
    Installed,
    /// Terminal failure
    Failed {
        code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Terminal abort, user- or system-initiated
    Canceled,
    /// Awaiting external user confirmation before the sequence can resume
    RequiresConfirmation { session_id: i32 },
}

impl InstallState {
    /// Error code used for failures that never reached the delivery service
    /// and for post-install hand-off failures.
    pub const LOCAL_FAILURE_CODE: i32 = -1;

    /// Failure reported by the delivery service itself
    #[must_use]
    pub fn provider_failure(code: i32) -> Self {
        Self::Failed {
            code,
            message: None,
        }
    }

    /// Failure raised locally, before or after the delivery service was involved
    pub fn local_failure(message: impl Into<String>) -> Self {
        Self::Failed {
            code: Self::LOCAL_FAILURE_CODE,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Installed | Self::Failed { .. } | Self::Canceled)
    }

    /// Short machine-friendly name of the variant
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading { .. } => "downloading",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Failed { .. } => "failed",
            Self::Canceled => "canceled",
            Self::RequiresConfirmation { .. } => "requires_confirmation",
        }
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Downloading { progress } => write!(f, "downloading ({progress}%)"),
            Self::Installing => write!(f, "installing"),
            Self::Installed => write!(f, "installed"),
            Self::Failed {
                code,
                message: Some(message),
            } => write!(f, "failed (code {code}): {message}"),
            Self::Failed {
                code,
                message: None,
            } => write!(f, "failed (code {code})"),
            Self::Canceled => write!(f, "canceled"),
            Self::RequiresConfirmation { session_id } => {
                write!(f, "waiting for confirmation (session {session_id})")
            }
        }
    }
}
