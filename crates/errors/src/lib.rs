#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for crikstats
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so they can travel through event channels.

use std::borrow::Cow;

use thiserror::Error;

pub mod activation;
pub mod config;
pub mod delivery;

// Re-export all error types at the root
pub use activation::ActivationError;
pub use config::ConfigError;
pub use delivery::DeliveryError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for crikstats operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Delivery(err) => err.user_message(),
            Error::Activation(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Delivery(err) => err.user_hint(),
            Error::Activation(err) => err.user_hint(),
            Error::Config(err) => err.user_hint().or(Some("Check your crikstats configuration file.")),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Delivery(err) => err.is_retryable(),
            Error::Activation(err) => err.is_retryable(),
            Error::Config(err) => err.is_retryable(),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Delivery(err) => err.user_code(),
            Error::Activation(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
        }
    }
}
