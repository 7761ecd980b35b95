//! Result of one activation request

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a `request_activation` call ended.
///
/// Unlike the published `InstallState`, this keeps install failures and
/// post-install hand-off failures apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    /// Module was already present; activated without tracking an install
    AlreadyInstalled,
    /// Module installed through a tracked sequence, then activated
    Installed,
    /// Install sequence ended in `Failed`
    InstallFailed { code: i32, message: Option<String> },
    /// Install succeeded (or was already present) but the hand-off failed
    ActivationFailed { message: String },
    /// Install sequence ended in `Canceled`
    Canceled,
    /// Install sequence closed without ever reaching a terminal state
    Interrupted,
}

impl ActivationOutcome {
    /// Whether the capability was entered
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(self, Self::AlreadyInstalled | Self::Installed)
    }
}

impl fmt::Display for ActivationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "opened (module already installed)"),
            Self::Installed => write!(f, "opened after install"),
            Self::InstallFailed {
                code,
                message: Some(message),
            } => write!(f, "install failed (code {code}): {message}"),
            Self::InstallFailed { code, message: None } => {
                write!(f, "install failed (code {code})")
            }
            Self::ActivationFailed { message } => write!(f, "could not open: {message}"),
            Self::Canceled => write!(f, "install canceled"),
            Self::Interrupted => write!(f, "install interrupted"),
        }
    }
}
