#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Capability activation for crikstats
//!
//! The coordinator drives an install sequence for a module, republishes every
//! state for presentation and hands off into the capability exactly once the
//! module is confirmed installed.

mod activator;
mod coordinator;

pub use activator::{Activator, EntryPointActivator, LaunchRequest, Launcher};
pub use coordinator::ActivationCoordinator;
