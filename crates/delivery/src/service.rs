//! Contract of the platform module delivery service

use crikstats_errors::DeliveryError;
use crikstats_types::{ModuleId, SessionStateUpdate};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Callback invoked by the delivery service for every session status report.
///
/// Called from the service's own thread or task; it must not block.
pub type StatusListener = Arc<dyn Fn(&SessionStateUpdate) + Send + Sync>;

/// Token identifying one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Platform component that downloads and installs modules, reporting
/// progress through registered listeners.
///
/// Injected as `Arc<dyn ModuleDeliveryService>` so hosts can scope its
/// lifetime and tests can substitute a double.
#[async_trait::async_trait]
pub trait ModuleDeliveryService: Send + Sync {
    /// Snapshot of the modules currently installed
    fn installed_modules(&self) -> BTreeSet<ModuleId>;

    /// Submit an install request. Resolves once the request has been
    /// accepted (with the session id) or refused; progress arrives through
    /// listeners.
    async fn request_install(&self, module: &ModuleId) -> Result<i32, DeliveryError>;

    /// Register a status listener
    fn register_listener(&self, listener: StatusListener) -> ListenerHandle;

    /// Remove a previously registered listener. Unknown handles are ignored.
    fn unregister_listener(&self, handle: ListenerHandle);

    /// Ask for the module to be removed at some later point
    async fn request_deferred_uninstall(&self, module: &ModuleId) -> Result<(), DeliveryError>;
}
