//! RAII guard binding one install call to one delivery-service listener
//!
//! The listener is registered when the session opens and unregistered
//! exactly once, whichever way the session ends: terminal state, submission
//! failure, explicit cancel, or the consumer dropping the stream.

use crikstats_delivery::{ListenerHandle, ModuleDeliveryService, StatusListener};
use crikstats_events::{EventEmitter, EventSender, InstallEvent};
use crikstats_types::ModuleId;
use std::sync::Arc;

pub(crate) struct InstallSession {
    delivery: Arc<dyn ModuleDeliveryService>,
    module: ModuleId,
    handle: Option<ListenerHandle>,
    event_sender: Option<EventSender>,
}

impl InstallSession {
    /// Register `listener` and take ownership of its handle
    pub(crate) fn open(
        delivery: Arc<dyn ModuleDeliveryService>,
        module: ModuleId,
        listener: StatusListener,
        event_sender: Option<EventSender>,
    ) -> Self {
        let handle = delivery.register_listener(listener);
        tracing::debug!(%module, %handle, "install listener registered");
        let session = Self {
            delivery,
            module,
            handle: Some(handle),
            event_sender,
        };
        session.emit_install(InstallEvent::ListenerRegistered {
            module: session.module.clone(),
            listener_id: handle.id(),
        });
        session
    }

    /// Unregister the listener. Later calls do nothing.
    pub(crate) fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.delivery.unregister_listener(handle);
        tracing::debug!(module = %self.module, %handle, "install listener released");
        self.emit_install(InstallEvent::ListenerReleased {
            module: self.module.clone(),
            listener_id: handle.id(),
        });
    }
}

impl EventEmitter for InstallSession {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Drop for InstallSession {
    fn drop(&mut self) {
        self.release();
    }
}
