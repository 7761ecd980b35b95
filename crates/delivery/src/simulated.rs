//! In-process delivery service used by tests and the demo CLI

use crate::service::{ListenerHandle, ModuleDeliveryService, StatusListener};
use crikstats_config::SimulatorConfig;
use crikstats_errors::DeliveryError;
use crikstats_types::{ModuleId, SessionStateUpdate, SessionStatus};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Timeline the simulation plays for every accepted install request
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub step_delay: Duration,
    pub total_bytes: i64,
    pub download_chunks: u32,
    pub require_confirmation: bool,
    pub fail_with: Option<i32>,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self::from(&SimulatorConfig::default())
    }
}

impl From<&SimulatorConfig> for SimulationPlan {
    fn from(config: &SimulatorConfig) -> Self {
        Self {
            step_delay: Duration::from_millis(config.step_delay_ms),
            total_bytes: config.total_bytes,
            download_chunks: config.download_chunks,
            require_confirmation: config.require_confirmation,
            fail_with: config.fail_with,
        }
    }
}

impl SimulationPlan {
    /// Status reports for one session, in delivery order
    #[must_use]
    pub fn updates(&self, session_id: i32, module: &ModuleId) -> Vec<SessionStateUpdate> {
        let report = |status| SessionStateUpdate::new(session_id, module.clone(), status);
        let chunks = self.download_chunks.max(1);
        let pause_after = (chunks / 2).max(1);

        let mut updates = vec![report(SessionStatus::Pending)];
        for chunk in 1..=chunks {
            let downloaded = self.total_bytes * i64::from(chunk) / i64::from(chunks);
            updates.push(report(SessionStatus::Downloading).with_bytes(downloaded, self.total_bytes));

            if self.require_confirmation && chunk == pause_after && chunk < chunks {
                updates.push(report(SessionStatus::RequiresUserConfirmation));
                // the simulated user accepts and the session resumes
                updates.push(report(SessionStatus::Pending));
            }
        }
        updates.push(report(SessionStatus::Downloaded));

        if let Some(code) = self.fail_with {
            updates.push(report(SessionStatus::Failed).with_error_code(code));
            return updates;
        }

        updates.push(report(SessionStatus::Installing));
        updates.push(report(SessionStatus::Installed));
        updates
    }
}

/// Counters exposed for assertions and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub install_requests: usize,
    pub uninstall_requests: usize,
    pub listener_registrations: usize,
    pub listener_unregistrations: usize,
    pub active_listeners: usize,
}

enum Mode {
    /// Updates are pushed by the caller, or replayed inline from `script_on_request`
    Manual,
    /// Every accepted request plays a `SimulationPlan` on a background task
    Planned(SimulationPlan),
}

struct Inner {
    mode: Mode,
    installed: Mutex<BTreeSet<ModuleId>>,
    listeners: Mutex<BTreeMap<ListenerHandle, StatusListener>>,
    scripts: Mutex<HashMap<ModuleId, Vec<SessionStateUpdate>>>,
    rejection: Mutex<Option<String>>,
    stats: Mutex<DeliveryStats>,
    requests: watch::Sender<usize>,
    next_listener: AtomicU64,
    next_session: AtomicI32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// Fan an update out to every registered listener.
    ///
    /// Listeners are invoked outside the registry lock so a callback may
    /// unregister itself.
    fn dispatch(&self, update: &SessionStateUpdate) {
        let listeners: Vec<StatusListener> = lock(&self.listeners).values().cloned().collect();
        tracing::trace!(
            status = update.status,
            session = update.session_id,
            listeners = listeners.len(),
            "dispatching session update"
        );
        for listener in listeners {
            listener(update);
        }
    }

    fn play(self: Arc<Self>, plan: SimulationPlan, updates: Vec<SessionStateUpdate>) {
        tokio::spawn(async move {
            for update in updates {
                tokio::time::sleep(plan.step_delay).await;
                if update.session_status() == Some(SessionStatus::Installed) {
                    lock(&self.installed).extend(update.module_ids.iter().cloned());
                }
                self.dispatch(&update);
            }
        });
    }
}

/// Delivery service living entirely in this process.
///
/// Cloning shares the same state.
#[derive(Clone)]
pub struct SimulatedDeliveryService {
    inner: Arc<Inner>,
}

impl Default for SimulatedDeliveryService {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDeliveryService {
    /// Manual service: nothing happens after an install request unless a
    /// script was registered or the caller pushes updates.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(Mode::Manual)
    }

    /// Service that plays `plan` for every accepted install request
    #[must_use]
    pub fn with_plan(plan: SimulationPlan) -> Self {
        Self::with_mode(Mode::Planned(plan))
    }

    /// Planned service configured from the `[simulator]` section
    #[must_use]
    pub fn from_config(config: &SimulatorConfig) -> Self {
        let service = Self::with_plan(SimulationPlan::from(config));
        for module in &config.preinstalled {
            service.mark_installed(module.as_str());
        }
        if config.reject_submission {
            service.reject_submissions("install service unavailable");
        }
        service
    }

    fn with_mode(mode: Mode) -> Self {
        let (requests, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                mode,
                installed: Mutex::new(BTreeSet::new()),
                listeners: Mutex::new(BTreeMap::new()),
                scripts: Mutex::new(HashMap::new()),
                rejection: Mutex::new(None),
                stats: Mutex::new(DeliveryStats::default()),
                requests,
                next_listener: AtomicU64::new(1),
                next_session: AtomicI32::new(1),
            }),
        }
    }

    /// Report a module as installed
    pub fn mark_installed(&self, module: impl Into<ModuleId>) {
        lock(&self.inner.installed).insert(module.into());
    }

    /// Refuse every subsequent install request with `reason`
    pub fn reject_submissions(&self, reason: impl Into<String>) {
        *lock(&self.inner.rejection) = Some(reason.into());
    }

    /// Updates replayed synchronously, in order, when `module` is requested
    pub fn script_on_request(&self, module: impl Into<ModuleId>, updates: Vec<SessionStateUpdate>) {
        lock(&self.inner.scripts).insert(module.into(), updates);
    }

    /// Deliver an update to all registered listeners right now
    pub fn push(&self, update: &SessionStateUpdate) {
        self.inner.dispatch(update);
    }

    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        *lock(&self.inner.stats)
    }

    /// Wait until at least `count` install requests have been received
    pub async fn wait_for_install_requests(&self, count: usize) {
        let mut requests = self.inner.requests.subscribe();
        // the sender lives as long as `self`, so this only fails if it is gone
        let _ = requests.wait_for(|seen| *seen >= count).await;
    }
}

#[async_trait::async_trait]
impl ModuleDeliveryService for SimulatedDeliveryService {
    fn installed_modules(&self) -> BTreeSet<ModuleId> {
        lock(&self.inner.installed).clone()
    }

    async fn request_install(&self, module: &ModuleId) -> Result<i32, DeliveryError> {
        lock(&self.inner.stats).install_requests += 1;
        self.inner.requests.send_modify(|seen| *seen += 1);

        if let Some(reason) = lock(&self.inner.rejection).clone() {
            tracing::debug!(%module, %reason, "refusing install request");
            return Err(DeliveryError::SubmissionFailed {
                module: module.to_string(),
                reason,
            });
        }

        let session_id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%module, session_id, "install request accepted");

        match &self.inner.mode {
            Mode::Manual => {
                let script = lock(&self.inner.scripts).get(module).cloned();
                for update in script.unwrap_or_default() {
                    self.inner.dispatch(&update);
                }
            }
            Mode::Planned(plan) => {
                let updates = plan.updates(session_id, module);
                Arc::clone(&self.inner).play(plan.clone(), updates);
            }
        }

        Ok(session_id)
    }

    fn register_listener(&self, listener: StatusListener) -> ListenerHandle {
        let handle = ListenerHandle::new(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        let active = {
            let mut listeners = lock(&self.inner.listeners);
            listeners.insert(handle, listener);
            listeners.len()
        };
        let mut stats = lock(&self.inner.stats);
        stats.listener_registrations += 1;
        stats.active_listeners = active;
        handle
    }

    fn unregister_listener(&self, handle: ListenerHandle) {
        let (removed, active) = {
            let mut listeners = lock(&self.inner.listeners);
            let removed = listeners.remove(&handle).is_some();
            (removed, listeners.len())
        };
        let mut stats = lock(&self.inner.stats);
        stats.listener_unregistrations += 1;
        stats.active_listeners = active;
        if !removed {
            tracing::warn!(%handle, "unregister called for unknown listener");
        }
    }

    async fn request_deferred_uninstall(&self, module: &ModuleId) -> Result<(), DeliveryError> {
        lock(&self.inner.stats).uninstall_requests += 1;
        if lock(&self.inner.installed).remove(module) {
            Ok(())
        } else {
            Err(DeliveryError::ModuleNotInstalled {
                module: module.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(updates: &[SessionStateUpdate]) -> Vec<SessionStatus> {
        updates
            .iter()
            .map(|update| update.session_status().unwrap())
            .collect()
    }

    #[test]
    fn plan_plays_full_install() {
        let plan = SimulationPlan {
            step_delay: Duration::ZERO,
            total_bytes: 100,
            download_chunks: 2,
            require_confirmation: false,
            fail_with: None,
        };
        let updates = plan.updates(1, &ModuleId::from("m"));
        assert_eq!(
            statuses(&updates),
            vec![
                SessionStatus::Pending,
                SessionStatus::Downloading,
                SessionStatus::Downloading,
                SessionStatus::Downloaded,
                SessionStatus::Installing,
                SessionStatus::Installed,
            ]
        );
        assert_eq!(updates[1].progress_percent(), 50);
        assert_eq!(updates[2].progress_percent(), 100);
    }

    #[test]
    fn plan_pauses_for_confirmation_and_fails() {
        let plan = SimulationPlan {
            step_delay: Duration::ZERO,
            total_bytes: 90,
            download_chunks: 3,
            require_confirmation: true,
            fail_with: Some(-10),
        };
        let updates = plan.updates(4, &ModuleId::from("m"));
        assert_eq!(
            statuses(&updates),
            vec![
                SessionStatus::Pending,
                SessionStatus::Downloading,
                SessionStatus::RequiresUserConfirmation,
                SessionStatus::Pending,
                SessionStatus::Downloading,
                SessionStatus::Downloading,
                SessionStatus::Downloaded,
                SessionStatus::Failed,
            ]
        );
        assert_eq!(updates.last().unwrap().error_code, -10);
        assert!(updates.iter().all(|update| update.session_id == 4));
    }

    #[test]
    fn listeners_are_counted() {
        let service = SimulatedDeliveryService::new();
        let handle = service.register_listener(Arc::new(|_| {}));
        assert_eq!(service.stats().active_listeners, 1);

        service.unregister_listener(handle);
        let stats = service.stats();
        assert_eq!(stats.listener_registrations, 1);
        assert_eq!(stats.listener_unregistrations, 1);
        assert_eq!(stats.active_listeners, 0);
    }
}
