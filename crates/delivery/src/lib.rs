#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Module delivery service abstraction for crikstats
//!
//! The delivery service is an external collaborator: it owns downloads and
//! installs and pushes status reports to registered listeners. This crate
//! defines the contract and ships an in-process simulation used by tests and
//! by the CLI.

mod service;
mod simulated;

pub use service::{ListenerHandle, ModuleDeliveryService, StatusListener};
pub use simulated::{DeliveryStats, SimulatedDeliveryService, SimulationPlan};
