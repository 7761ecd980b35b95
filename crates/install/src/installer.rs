//! Feature module installer

use crate::stream::InstallStream;
use crikstats_config::DeliveryConfig;
use crikstats_delivery::ModuleDeliveryService;
use crikstats_events::{EventEmitter, EventSender, InstallEvent};
use crikstats_types::{InstallState, ModuleId};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Installer seam used by the activation coordinator
pub trait ModuleInstaller: Send + Sync {
    /// Whether the delivery service reports `module` as installed right now
    fn is_installed(&self, module: &ModuleId) -> bool;

    /// Cold stream of install states for `module`
    fn install(&self, module: &ModuleId) -> BoxStream<'static, InstallState>;
}

/// Turns the delivery service's listener callbacks into install streams.
///
/// Every call to [`install`](Self::install) gets its own listener and its own
/// install request. Concurrent calls for the same module are not merged.
#[derive(Clone)]
pub struct FeatureModuleInstaller {
    delivery: Arc<dyn ModuleDeliveryService>,
    event_buffer: usize,
    event_sender: Option<EventSender>,
}

impl FeatureModuleInstaller {
    #[must_use]
    pub fn new(delivery: Arc<dyn ModuleDeliveryService>) -> Self {
        Self::from_config(delivery, &DeliveryConfig::default())
    }

    #[must_use]
    pub fn from_config(delivery: Arc<dyn ModuleDeliveryService>, config: &DeliveryConfig) -> Self {
        Self {
            delivery,
            event_buffer: config.event_buffer.max(1),
            event_sender: None,
        }
    }

    /// Capacity of the per-install state queue
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    #[must_use]
    pub fn is_installed(&self, module: &ModuleId) -> bool {
        self.delivery.installed_modules().contains(module)
    }

    #[must_use]
    pub fn installed_modules(&self) -> BTreeSet<ModuleId> {
        self.delivery.installed_modules()
    }

    /// Build a cold install stream. No work starts until it is first polled.
    pub fn install(&self, module: impl Into<ModuleId>) -> InstallStream {
        InstallStream::new(
            module.into(),
            Arc::clone(&self.delivery),
            self.event_buffer,
            self.event_sender.clone(),
        )
    }

    /// Ask the delivery service to remove `module` at its convenience.
    ///
    /// Fire and forget: a refusal is logged and otherwise ignored. Modules
    /// that are not installed are skipped without contacting the service.
    pub async fn uninstall(&self, module: &ModuleId) {
        if !self.is_installed(module) {
            tracing::debug!(%module, "uninstall skipped, module not installed");
            return;
        }
        self.emit_install(InstallEvent::UninstallRequested {
            module: module.clone(),
        });
        match self.delivery.request_deferred_uninstall(module).await {
            Ok(()) => tracing::info!(%module, "deferred uninstall requested"),
            Err(err) => {
                tracing::warn!(%module, error = %err, "deferred uninstall refused");
                self.emit_warning_with_context(
                    format!("could not schedule removal of {module}"),
                    err.reason(),
                );
            }
        }
    }
}

impl ModuleInstaller for FeatureModuleInstaller {
    fn is_installed(&self, module: &ModuleId) -> bool {
        FeatureModuleInstaller::is_installed(self, module)
    }

    fn install(&self, module: &ModuleId) -> BoxStream<'static, InstallState> {
        FeatureModuleInstaller::install(self, module.clone()).boxed()
    }
}

impl EventEmitter for FeatureModuleInstaller {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}
