//! crikstats - On-demand player statistics module delivery
//!
//! Command line front end over the feature module installer and the
//! activation coordinator, wired to the in-process delivery service.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use crikstats_activation::{ActivationCoordinator, EntryPointActivator, LaunchRequest, Launcher};
use crikstats_config::Config;
use crikstats_delivery::{ModuleDeliveryService, SimulatedDeliveryService};
use crikstats_errors::{ActivationError, DeliveryError};
use crikstats_events::{EventReceiver, EventSender};
use crikstats_install::FeatureModuleInstaller;
use crikstats_types::{
    ActivationOutcome, ColorChoice, InstallState, ModuleId, OutputFormat, SubjectId,
};
use futures::StreamExt;
use std::process;
use std::sync::Arc;
use tokio::select;
use tokio::sync::watch;
use tracing::{error, info};

type Coordinator = ActivationCoordinator<FeatureModuleInstaller, EntryPointActivator>;

/// Components a command runs against
struct Services {
    installer: FeatureModuleInstaller,
    coordinator: Coordinator,
    feature_module: ModuleId,
}

impl Services {
    fn new(config: &Config, event_sender: &EventSender) -> Self {
        let delivery: Arc<dyn ModuleDeliveryService> =
            Arc::new(SimulatedDeliveryService::from_config(&config.simulator));

        let installer = FeatureModuleInstaller::from_config(Arc::clone(&delivery), &config.delivery)
            .with_event_sender(event_sender.clone());

        let launcher: Launcher = Arc::new(|request: &LaunchRequest| {
            info!(
                module = %request.module,
                entry_point = %request.entry_point,
                subject = %request.subject,
                "launching statistics entry point"
            );
            Ok(())
        });
        let activator = EntryPointActivator::from_config(delivery, config, launcher);

        Self {
            coordinator: ActivationCoordinator::with_event_sender(
                installer.clone(),
                activator,
                event_sender.clone(),
            ),
            installer,
            feature_module: config.delivery.feature_module_id(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting crikstats v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command)?;

    let json_output = cli.global.json || config.general.default_output == OutputFormat::Json;

    let (event_sender, event_receiver) = crikstats_events::channel();
    let services = Services::new(&config, &event_sender);
    // only the services hold senders now, so the channel closes with them
    drop(event_sender);

    let renderer = OutputRenderer::new(json_output, config.general.color);

    let colors_enabled = match config.general.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, json_output);

    let result = execute_command_with_events(
        cli.command,
        &services,
        &renderer,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;
    ensure_success(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    services: &Services,
    renderer: &OutputRenderer,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, services, renderer));

    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    services: &Services,
    renderer: &OutputRenderer,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Open { subject, .. } => {
            let subject = SubjectId::from(subject);
            let module = services.feature_module.clone();
            let outcome = open(services, renderer, subject.clone(), module.clone()).await;
            Ok(CommandResult::Activation {
                subject,
                module,
                outcome,
            })
        }

        Commands::Install { module } => {
            let module = ModuleId::from(module);
            let mut states = services.installer.install(module.clone());
            let mut seen = Vec::new();
            while let Some(state) = states.next().await {
                renderer.render_state(&module, &state);
                seen.push(state);
            }
            Ok(CommandResult::InstallStates {
                module,
                states: seen,
            })
        }

        Commands::Modules => Ok(CommandResult::Modules {
            modules: services.installer.installed_modules().into_iter().collect(),
        }),

        Commands::Uninstall { module } => {
            let module = ModuleId::from(module);
            if !services.installer.is_installed(&module) {
                return Err(DeliveryError::ModuleNotInstalled {
                    module: module.to_string(),
                }
                .into());
            }
            services.installer.uninstall(&module).await;
            Ok(CommandResult::Success {
                message: format!("Removal of {module} scheduled"),
            })
        }
    }
}

/// Request activation and render the coordinator's output while it runs
async fn open(
    services: &Services,
    renderer: &OutputRenderer,
    subject: SubjectId,
    module: ModuleId,
) -> ActivationOutcome {
    let mut output = services.coordinator.subscribe();
    let activation = services
        .coordinator
        .request_activation(subject, module.clone());
    tokio::pin!(activation);

    let outcome = loop {
        select! {
            biased;

            Ok(()) = output.changed() => {
                let state = output.borrow_and_update().clone();
                if let Some(state) = state {
                    renderer.render_state(&module, &state);
                }
            }

            outcome = &mut activation => break outcome,
        }
    };

    // the last publish can land in the same poll that completes the activation
    if let Some(state) = unseen_state(&mut output) {
        renderer.render_state(&module, &state);
    }
    outcome
}

/// State published since the receiver last looked, if any
fn unseen_state(output: &mut watch::Receiver<Option<InstallState>>) -> Option<InstallState> {
    if output.has_changed().unwrap_or(false) {
        output.borrow_and_update().clone()
    } else {
        None
    }
}

/// Turn an unsuccessful result into an error so the process exits non-zero
fn ensure_success(result: &CommandResult) -> Result<(), CliError> {
    match result {
        CommandResult::Activation {
            subject,
            module,
            outcome,
        } => match outcome {
            outcome if outcome.is_activated() => Ok(()),
            ActivationOutcome::ActivationFailed { message } => Err(ActivationError::Failed {
                subject: subject.to_string(),
                message: message.clone(),
            }
            .into()),
            other => Err(ActivationError::InstallIncomplete {
                module: module.to_string(),
                message: other.to_string(),
            }
            .into()),
        },
        CommandResult::InstallStates { module, states } => match states.last() {
            Some(InstallState::Installed) => Ok(()),
            Some(InstallState::Failed { code, message })
                if *code == InstallState::LOCAL_FAILURE_CODE =>
            {
                Err(DeliveryError::SubmissionFailed {
                    module: module.to_string(),
                    reason: message.clone().unwrap_or_default(),
                }
                .into())
            }
            Some(InstallState::Failed { code, .. }) => Err(DeliveryError::ProviderFailure {
                module: module.to_string(),
                code: *code,
            }
            .into()),
            last => Err(ActivationError::InstallIncomplete {
                module: module.to_string(),
                message: last.map_or_else(
                    || "no install states received".to_string(),
                    ToString::to_string,
                ),
            }
            .into()),
        },
        CommandResult::Modules { .. } | CommandResult::Success { .. } => Ok(()),
    }
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let debug_filter = "info,crikstats=debug,crikstats_install=debug,crikstats_activation=debug,crikstats_delivery=debug";

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        let log_dir = Config::logs_dir();
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }

        let log_file = log_dir.join(format!(
            "crikstats-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(debug_filter)),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // JSON mode: keep stderr clean
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,crikstats=warn")),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &cli::GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    if let Some(color) = &global.color {
        config.general.color = *color;
    }

    if let Commands::Open {
        module: Some(module),
        ..
    } = command
    {
        if module.trim().is_empty() {
            return Err(CliError::InvalidArguments(
                "--module must not be empty".to_string(),
            ));
        }
        config.delivery.feature_module.clone_from(module);
    }

    Ok(())
}
