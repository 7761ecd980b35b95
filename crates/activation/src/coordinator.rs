//! Activation coordinator
//!
//! Drives one install sequence per request, republishes its states on a
//! watch channel and enters the capability at most once per request.

use crate::activator::Activator;
use crikstats_events::{ActivationEvent, EventEmitter, EventSender};
use crikstats_install::ModuleInstaller;
use crikstats_types::{ActivationOutcome, InstallState, ModuleId, SubjectId};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Inner<I, A> {
    installer: I,
    activator: A,
    output: watch::Sender<Option<InstallState>>,
    event_sender: Option<EventSender>,
}

/// Coordinates install tracking and the hand-off into the capability.
///
/// The published output starts as `None` and holds the latest state of the
/// most recent tracked install. Cloning shares the output.
pub struct ActivationCoordinator<I, A> {
    inner: Arc<Inner<I, A>>,
}

impl<I, A> Clone for ActivationCoordinator<I, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, A> ActivationCoordinator<I, A>
where
    I: ModuleInstaller,
    A: Activator,
{
    #[must_use]
    pub fn new(installer: I, activator: A) -> Self {
        Self::build(installer, activator, None)
    }

    #[must_use]
    pub fn with_event_sender(installer: I, activator: A, event_sender: EventSender) -> Self {
        Self::build(installer, activator, Some(event_sender))
    }

    fn build(installer: I, activator: A, event_sender: Option<EventSender>) -> Self {
        let (output, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                installer,
                activator,
                output,
                event_sender,
            }),
        }
    }

    #[must_use]
    pub fn installer(&self) -> &I {
        &self.inner.installer
    }

    #[must_use]
    pub fn activator(&self) -> &A {
        &self.inner.activator
    }

    /// Observe the published output
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<InstallState>> {
        self.inner.output.subscribe()
    }

    /// Snapshot of the published output
    #[must_use]
    pub fn current(&self) -> Option<InstallState> {
        self.inner.output.borrow().clone()
    }

    /// Reset the published output to `None`.
    ///
    /// An install still being tracked keeps publishing afterwards.
    pub fn clear_error(&self) {
        self.publish(None);
        self.emit_activation(ActivationEvent::OutputCleared);
    }

    /// Same as [`clear_error`](Self::clear_error)
    pub fn reset(&self) {
        self.clear_error();
    }

    /// Reach the capability in `module` for `subject`.
    ///
    /// An installed module is entered directly and the output is left alone
    /// unless the hand-off fails. Otherwise the install sequence is tracked
    /// to its terminal state and every state is published. Dropping the
    /// returned future stops tracking and releases the install listener.
    pub async fn request_activation(
        &self,
        subject: impl Into<SubjectId>,
        module: impl Into<ModuleId>,
    ) -> ActivationOutcome {
        let subject = subject.into();
        let module = module.into();

        tracing::info!(%subject, %module, "activation requested");
        self.emit_activation(ActivationEvent::Requested {
            subject: subject.clone(),
            module: module.clone(),
        });

        let outcome = if self.inner.installer.is_installed(&module) {
            match self.hand_off(&subject, &module).await {
                Ok(()) => ActivationOutcome::AlreadyInstalled,
                Err(message) => ActivationOutcome::ActivationFailed { message },
            }
        } else {
            self.track_install(&subject, &module).await
        };

        tracing::debug!(%subject, %module, %outcome, "activation request finished");
        self.emit_activation(ActivationEvent::Finished {
            subject,
            module,
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn track_install(&self, subject: &SubjectId, module: &ModuleId) -> ActivationOutcome {
        let mut states = self.inner.installer.install(module);

        while let Some(state) = states.next().await {
            self.publish(Some(state.clone()));
            match state {
                InstallState::Installed => {
                    // stop consuming: a repeated Installed must not enter twice
                    drop(states);
                    return match self.hand_off(subject, module).await {
                        Ok(()) => {
                            self.publish(None);
                            ActivationOutcome::Installed
                        }
                        Err(message) => ActivationOutcome::ActivationFailed { message },
                    };
                }
                InstallState::Failed { code, message } => {
                    return ActivationOutcome::InstallFailed { code, message };
                }
                InstallState::Canceled => return ActivationOutcome::Canceled,
                InstallState::Pending
                | InstallState::Downloading { .. }
                | InstallState::Installing
                | InstallState::RequiresConfirmation { .. } => {}
            }
        }

        tracing::warn!(%subject, %module, "install sequence ended without a terminal state");
        self.emit_warning_with_context(
            format!("install of {module} stopped before it finished"),
            format!("{subject} was not opened"),
        );
        ActivationOutcome::Interrupted
    }

    /// Enter the capability, publishing a local failure if that goes wrong
    async fn hand_off(&self, subject: &SubjectId, module: &ModuleId) -> Result<(), String> {
        match self.inner.activator.activate(subject).await {
            Ok(()) => {
                tracing::info!(%subject, %module, "capability activated");
                self.emit_activation(ActivationEvent::Activated {
                    subject: subject.clone(),
                    module: module.clone(),
                });
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(%subject, %module, error = %message, "activation failed");
                self.publish(Some(InstallState::local_failure(message.clone())));
                self.emit_activation(ActivationEvent::Failed {
                    subject: subject.clone(),
                    module: module.clone(),
                    error: message.clone(),
                });
                Err(message)
            }
        }
    }

    fn publish(&self, state: Option<InstallState>) {
        self.inner.output.send_replace(state);
    }
}

impl<I, A> ActivationCoordinator<I, A>
where
    I: ModuleInstaller + 'static,
    A: Activator + 'static,
{
    /// Run [`request_activation`](Self::request_activation) on the runtime.
    ///
    /// Aborting the handle cancels the install subscription.
    pub fn spawn_activation(
        &self,
        subject: impl Into<SubjectId>,
        module: impl Into<ModuleId>,
    ) -> JoinHandle<ActivationOutcome> {
        let coordinator = self.clone();
        let subject = subject.into();
        let module = module.into();
        tokio::spawn(async move { coordinator.request_activation(subject, module).await })
    }
}

impl<I, A> EventEmitter for ActivationCoordinator<I, A> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.inner.event_sender.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crikstats_errors::ActivationError;
    use crikstats_events::GeneralEvent;
    use futures::stream::{self, BoxStream};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Installer that replays a fixed list, ignoring the module
    struct ScriptedInstaller {
        installed: bool,
        states: Vec<InstallState>,
        installs: AtomicUsize,
    }

    impl ScriptedInstaller {
        fn new(installed: bool, states: Vec<InstallState>) -> Self {
            Self {
                installed,
                states,
                installs: AtomicUsize::new(0),
            }
        }
    }

    impl ModuleInstaller for ScriptedInstaller {
        fn is_installed(&self, _module: &ModuleId) -> bool {
            self.installed
        }

        fn install(&self, _module: &ModuleId) -> BoxStream<'static, InstallState> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            stream::iter(self.states.clone()).boxed()
        }
    }

    #[derive(Default)]
    struct CountingActivator {
        calls: AtomicUsize,
        failure: Option<String>,
    }

    #[async_trait]
    impl Activator for CountingActivator {
        async fn activate(&self, subject: &SubjectId) -> Result<(), ActivationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(message) => Err(ActivationError::Failed {
                    subject: subject.to_string(),
                    message: message.clone(),
                }),
                None => Ok(()),
            }
        }
    }

    fn failing(message: &str) -> CountingActivator {
        CountingActivator {
            calls: AtomicUsize::new(0),
            failure: Some(message.to_string()),
        }
    }

    #[tokio::test]
    async fn duplicate_installed_activates_once() {
        let installer = ScriptedInstaller::new(
            false,
            vec![
                InstallState::Pending,
                InstallState::Installed,
                InstallState::Installed,
            ],
        );
        let coordinator = ActivationCoordinator::new(installer, CountingActivator::default());

        let outcome = coordinator.request_activation("player-7", "feature_player").await;
        assert_eq!(outcome, ActivationOutcome::Installed);
        assert_eq!(coordinator.activator().calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.current(), None);
    }

    #[tokio::test]
    async fn already_installed_skips_install() {
        let installer = ScriptedInstaller::new(true, vec![InstallState::Installed]);
        let coordinator = ActivationCoordinator::new(installer, CountingActivator::default());
        let mut output = coordinator.subscribe();

        let outcome = coordinator.request_activation("player-7", "feature_player").await;
        assert_eq!(outcome, ActivationOutcome::AlreadyInstalled);
        assert_eq!(coordinator.installer().installs.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.activator().calls.load(Ordering::SeqCst), 1);
        assert!(!output.has_changed().unwrap());
        assert_eq!(coordinator.current(), None);
    }

    #[tokio::test]
    async fn already_installed_failure_is_published() {
        let installer = ScriptedInstaller::new(true, Vec::new());
        let coordinator = ActivationCoordinator::new(installer, failing("no screen"));

        let outcome = coordinator.request_activation("player-7", "feature_player").await;
        assert!(matches!(outcome, ActivationOutcome::ActivationFailed { .. }));
        assert!(matches!(
            coordinator.current(),
            Some(InstallState::Failed { code: -1, message: Some(_) })
        ));
    }

    #[tokio::test]
    async fn activation_failure_after_install_is_conflated() {
        let installer = ScriptedInstaller::new(false, vec![InstallState::Installed]);
        let coordinator = ActivationCoordinator::new(installer, failing("no screen"));

        let outcome = coordinator.request_activation("player-7", "feature_player").await;
        let ActivationOutcome::ActivationFailed { message } = outcome else {
            panic!("expected activation failure");
        };
        assert!(message.contains("no screen"));
        assert_eq!(
            coordinator.current(),
            Some(InstallState::local_failure(message))
        );
    }

    #[tokio::test]
    async fn install_failure_is_published_without_activation() {
        let installer = ScriptedInstaller::new(
            false,
            vec![InstallState::Pending, InstallState::provider_failure(-6)],
        );
        let coordinator = ActivationCoordinator::new(installer, CountingActivator::default());

        let outcome = coordinator.request_activation("player-7", "feature_player").await;
        assert_eq!(
            outcome,
            ActivationOutcome::InstallFailed {
                code: -6,
                message: None
            }
        );
        assert_eq!(coordinator.activator().calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.current(), Some(InstallState::provider_failure(-6)));

        coordinator.clear_error();
        assert_eq!(coordinator.current(), None);
    }

    #[tokio::test]
    async fn cancellation_and_interruption() {
        let canceled = ActivationCoordinator::new(
            ScriptedInstaller::new(false, vec![InstallState::Canceled]),
            CountingActivator::default(),
        );
        assert_eq!(
            canceled.request_activation("p", "m").await,
            ActivationOutcome::Canceled
        );
        assert_eq!(canceled.current(), Some(InstallState::Canceled));

        let interrupted = ActivationCoordinator::new(
            ScriptedInstaller::new(false, vec![InstallState::Downloading { progress: 40 }]),
            CountingActivator::default(),
        );
        assert_eq!(
            interrupted.request_activation("p", "m").await,
            ActivationOutcome::Interrupted
        );
        assert_eq!(interrupted.activator().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn interruption_is_reported_as_warning() {
        let (tx, mut rx) = crikstats_events::channel();
        let coordinator = ActivationCoordinator::with_event_sender(
            ScriptedInstaller::new(false, vec![InstallState::Pending]),
            CountingActivator::default(),
            tx,
        );
        coordinator.request_activation("p", "m").await;

        let mut warnings = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let crikstats_events::AppEvent::General(GeneralEvent::Warning { message, .. }) =
                event
            {
                warnings.push(message);
            }
        }
        assert_eq!(warnings, vec!["install of m stopped before it finished".to_string()]);
    }
}
