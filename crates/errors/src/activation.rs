//! Capability activation error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ActivationError {
    #[error("entry point {entry_point} of module {module} cannot be reached")]
    EntryPointUnreachable { module: String, entry_point: String },

    #[error("activation of {subject} failed: {message}")]
    Failed { subject: String, message: String },

    #[error("install of {module} did not finish: {message}")]
    InstallIncomplete { module: String, message: String },
}

impl UserFacingError for ActivationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::EntryPointUnreachable { .. } => {
                Some("The module may still be finishing its install; try opening it again.")
            }
            Self::InstallIncomplete { .. } => Some("Request the module again to restart the install."),
            Self::Failed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::EntryPointUnreachable { .. } => "activation.entry_point_unreachable",
            Self::Failed { .. } => "activation.failed",
            Self::InstallIncomplete { .. } => "activation.install_incomplete",
        };
        Some(code)
    }
}
