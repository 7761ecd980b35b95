//! Event handling and user feedback

use console::Style;
use crikstats_events::{ActivationEvent, AppEvent, GeneralEvent, InstallEvent};

/// Renders lifecycle events to stderr while a command runs.
///
/// Install states themselves are rendered by the command that consumes
/// them, so `StateChanged` is only shown in debug mode.
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    quiet: bool,
}

impl EventHandler {
    /// Create new event handler; `quiet` suppresses everything (JSON mode)
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        crate::logging::log_event_with_tracing(&event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::General(event) => self.handle_general_event(event),
            AppEvent::Install(event) => self.handle_install_event(event),
            AppEvent::Activation(event) => self.handle_activation_event(event),
        }
    }

    fn handle_general_event(&self, event: GeneralEvent) {
        let GeneralEvent::Warning { message, context } = event;
        match context {
            Some(context) => self.show_warning(&format!("⚠️  {message} ({context})")),
            None => self.show_warning(&format!("⚠️  {message}")),
        }
    }

    fn handle_install_event(&self, event: InstallEvent) {
        match event {
            InstallEvent::AlreadyInstalled { module } => {
                self.show_status(&format!("📦 {module} is already installed"));
            }
            InstallEvent::Requested { module } => {
                self.show_status(&format!("🔄 Requesting install of {module}"));
            }
            InstallEvent::SubmissionFailed { module, reason } => {
                self.show_error(&format!("❌ Install request for {module} refused: {reason}"));
            }
            InstallEvent::UninstallRequested { module } => {
                self.show_status(&format!("🧹 Scheduling removal of {module}"));
            }
            InstallEvent::ListenerRegistered {
                module,
                listener_id,
            } => self.show_debug(&format!("listener#{listener_id} registered for {module}")),
            InstallEvent::ListenerReleased {
                module,
                listener_id,
            } => self.show_debug(&format!("listener#{listener_id} released for {module}")),
            InstallEvent::StateChanged { module, state } => {
                self.show_debug(&format!("{module} -> {state}"));
            }
        }
    }

    fn handle_activation_event(&self, event: ActivationEvent) {
        match event {
            ActivationEvent::Requested { subject, module } => {
                self.show_debug(&format!("activation requested for {subject} via {module}"));
            }
            ActivationEvent::Activated { subject, .. } => {
                self.show_status(&format!("📊 Opening statistics for {subject}"));
            }
            ActivationEvent::Failed { subject, error, .. } => {
                self.show_error(&format!("❌ Could not open statistics for {subject}: {error}"));
            }
            ActivationEvent::Finished { outcome, .. } => {
                self.show_debug(&format!("activation finished: {outcome}"));
            }
            ActivationEvent::OutputCleared => self.show_debug("activation output cleared"),
        }
    }

    /// Show status message
    fn show_status(&self, message: &str) {
        eprintln!("{message}");
    }

    fn show_warning(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{}", Style::new().yellow().apply_to(message));
        } else {
            eprintln!("{message}");
        }
    }

    /// Show error message
    fn show_error(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{}", Style::new().red().apply_to(message));
        } else {
            eprintln!("{message}");
        }
    }

    fn show_debug(&self, message: &str) {
        if !self.debug_enabled {
            return;
        }
        if self.colors_enabled {
            eprintln!("{}", Style::new().dim().apply_to(format!("[debug] {message}")));
        } else {
            eprintln!("[debug] {message}");
        }
    }
}
