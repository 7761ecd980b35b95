//! Module delivery service error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("install request for {module} could not be submitted: {reason}")]
    SubmissionFailed { module: String, reason: String },

    #[error("delivery service reported failure for {module} (code {code})")]
    ProviderFailure { module: String, code: i32 },

    #[error("module not installed: {module}")]
    ModuleNotInstalled { module: String },
}

impl DeliveryError {
    /// Reason text that accompanies a `Failed(-1, reason)` install state.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::SubmissionFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

impl UserFacingError for DeliveryError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::SubmissionFailed { .. } => {
                Some("Check the network connection and request the module again.")
            }
            Self::ProviderFailure { .. } => {
                Some("The download was rejected by the delivery service; retry later.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailed { .. } | Self::ProviderFailure { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::SubmissionFailed { .. } => "delivery.submission_failed",
            Self::ProviderFailure { .. } => "delivery.provider_failure",
            Self::ModuleNotInstalled { .. } => "delivery.module_not_installed",
        };
        Some(code)
    }
}
