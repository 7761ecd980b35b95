//! Cold, cancellable stream of install states for one module

use crate::session::InstallSession;
use crate::translate::translate;
use crikstats_delivery::{ModuleDeliveryService, StatusListener};
use crikstats_errors::DeliveryError;
use crikstats_events::{EventEmitter, EventSender, InstallEvent};
use crikstats_types::{InstallState, ModuleId, SessionStateUpdate};
use futures::future::BoxFuture;
use futures::stream::FusedStream;
use futures::task::AtomicWaker;
use futures::{FutureExt, Stream};
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Stream returned by [`FeatureModuleInstaller::install`].
///
/// Nothing happens until the first poll. The first poll either finds the
/// module already installed and yields a single `Installed`, or registers a
/// status listener and submits the install request. The stream ends right
/// after the first terminal state. Cancelling or dropping it releases the
/// listener.
///
/// [`FeatureModuleInstaller::install`]: crate::FeatureModuleInstaller::install
pub struct InstallStream {
    module: ModuleId,
    delivery: Arc<dyn ModuleDeliveryService>,
    buffer: usize,
    event_sender: Option<EventSender>,
    phase: Phase,
}

enum Phase {
    Cold,
    Active(ActiveSession),
    Finished,
}

struct ActiveSession {
    // released when the phase is replaced
    _session: InstallSession,
    states: mpsc::Receiver<InstallState>,
    overflow: Arc<Overflow>,
    submission: Option<BoxFuture<'static, Result<i32, DeliveryError>>>,
    rejection: Option<DeliveryError>,
}

enum Step {
    State(InstallState),
    Rejected(DeliveryError),
    Closed,
}

/// Holds a terminal state that arrived while the queue was full
#[derive(Default)]
struct Overflow {
    slot: Mutex<Option<InstallState>>,
    waker: AtomicWaker,
}

impl Overflow {
    fn stash(&self, state: InstallState) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(state);
        self.waker.wake();
    }

    fn take(&self) -> Option<InstallState> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl InstallStream {
    pub(crate) fn new(
        module: ModuleId,
        delivery: Arc<dyn ModuleDeliveryService>,
        buffer: usize,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            module,
            delivery,
            buffer: buffer.max(1),
            event_sender,
            phase: Phase::Cold,
        }
    }

    /// Module this stream installs
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Stop observing the install.
    ///
    /// Releases the listener if one is registered. The install request
    /// itself is not withdrawn from the delivery service. Calling this more
    /// than once, or on a finished stream, does nothing.
    pub fn cancel(&mut self) {
        if let Phase::Active(_) = self.phase {
            tracing::debug!(module = %self.module, "install stream cancelled");
        }
        self.phase = Phase::Finished;
    }

    fn start(&self) -> ActiveSession {
        let (tx, states) = mpsc::channel(self.buffer);
        let overflow = Arc::new(Overflow::default());
        let listener = forwarder(self.module.clone(), tx, Arc::clone(&overflow));

        // listener goes in before the request so no early report is missed
        let session = InstallSession::open(
            Arc::clone(&self.delivery),
            self.module.clone(),
            listener,
            self.event_sender.clone(),
        );

        tracing::info!(module = %self.module, "requesting module install");
        self.emit_install(InstallEvent::Requested {
            module: self.module.clone(),
        });

        let delivery = Arc::clone(&self.delivery);
        let module = self.module.clone();
        let submission = async move { delivery.request_install(&module).await }.boxed();

        ActiveSession {
            _session: session,
            states,
            overflow,
            submission: Some(submission),
            rejection: None,
        }
    }

    fn finish_with(&mut self, state: InstallState) -> Poll<Option<InstallState>> {
        self.emit_install(InstallEvent::StateChanged {
            module: self.module.clone(),
            state: state.clone(),
        });
        if state.is_terminal() {
            self.phase = Phase::Finished;
        }
        Poll::Ready(Some(state))
    }
}

impl ActiveSession {
    fn poll_step(&mut self, cx: &mut Context<'_>) -> Poll<Step> {
        if let Some(submission) = self.submission.as_mut() {
            if let Poll::Ready(result) = submission.poll_unpin(cx) {
                self.submission = None;
                match result {
                    Ok(session_id) => tracing::debug!(session_id, "install request accepted"),
                    Err(err) => self.rejection = Some(err),
                }
            }
        }

        if self.rejection.is_some() {
            // reports delivered before the refusal keep their place
            if let Some(state) = self.states.try_recv().ok().or_else(|| self.overflow.take()) {
                return Poll::Ready(Step::State(state));
            }
            if let Some(err) = self.rejection.take() {
                return Poll::Ready(Step::Rejected(err));
            }
        }

        match self.states.poll_recv(cx) {
            Poll::Ready(Some(state)) => Poll::Ready(Step::State(state)),
            Poll::Ready(None) => Poll::Ready(Step::Closed),
            Poll::Pending => {
                self.overflow.waker.register(cx.waker());
                match self.overflow.take() {
                    Some(state) => Poll::Ready(Step::State(state)),
                    None => Poll::Pending,
                }
            }
        }
    }
}

impl Stream for InstallStream {
    type Item = InstallState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let step = match &mut this.phase {
                Phase::Finished => return Poll::Ready(None),
                Phase::Cold => {
                    if this.delivery.installed_modules().contains(&this.module) {
                        tracing::debug!(module = %this.module, "module already installed");
                        this.phase = Phase::Finished;
                        this.emit_install(InstallEvent::AlreadyInstalled {
                            module: this.module.clone(),
                        });
                        return Poll::Ready(Some(InstallState::Installed));
                    }
                    this.phase = Phase::Active(this.start());
                    continue;
                }
                Phase::Active(active) => match active.poll_step(cx) {
                    Poll::Ready(step) => step,
                    Poll::Pending => return Poll::Pending,
                },
            };

            return match step {
                Step::State(state) => this.finish_with(state),
                Step::Rejected(err) => {
                    tracing::warn!(module = %this.module, error = %err, "install request rejected");
                    this.emit_install(InstallEvent::SubmissionFailed {
                        module: this.module.clone(),
                        reason: err.reason(),
                    });
                    this.finish_with(InstallState::local_failure(err.reason()))
                }
                Step::Closed => {
                    this.phase = Phase::Finished;
                    Poll::Ready(None)
                }
            };
        }
    }
}

impl FusedStream for InstallStream {
    fn is_terminated(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }
}

impl EventEmitter for InstallStream {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl fmt::Debug for InstallStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Cold => "cold",
            Phase::Active(_) => "active",
            Phase::Finished => "finished",
        };
        f.debug_struct("InstallStream")
            .field("module", &self.module)
            .field("phase", &phase)
            .finish_non_exhaustive()
    }
}

/// Listener that filters reports for `module` and feeds them into the queue.
///
/// At most one terminal state is ever forwarded. Non-terminal states that
/// find the queue full are dropped; a terminal one goes to the overflow slot.
fn forwarder(
    module: ModuleId,
    tx: mpsc::Sender<InstallState>,
    overflow: Arc<Overflow>,
) -> StatusListener {
    let closed = AtomicBool::new(false);
    Arc::new(move |update: &SessionStateUpdate| {
        if closed.load(Ordering::Acquire) || !update.concerns(&module) {
            return;
        }
        let Some(state) = translate(update) else {
            tracing::debug!(%module, status = update.status, "ignoring session status");
            return;
        };
        if state.is_terminal() && closed.swap(true, Ordering::AcqRel) {
            return;
        }

        match tx.try_send(state) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(state)) if state.is_terminal() => overflow.stash(state),
            Err(TrySendError::Full(state)) => {
                tracing::warn!(%module, %state, "install state queue full, dropping update");
            }
        }
    })
}
