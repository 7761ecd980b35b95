#![warn(clippy::pedantic)]
#![deny(clippy::all)]

//! On-demand feature module installation for crikstats
//!
//! Bridges the delivery service's register/unregister listener API into a
//! cold, cancellable stream of [`InstallState`](crikstats_types::InstallState)
//! values, one stream per install call.

mod installer;
mod session;
mod stream;
mod translate;

pub use installer::{FeatureModuleInstaller, ModuleInstaller};
pub use stream::InstallStream;
