//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use crikstats_types::{ActivationOutcome, ColorChoice, InstallState, ModuleId, SubjectId};
use serde::Serialize;
use std::io;

/// Final result of a command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Activation {
        subject: SubjectId,
        module: ModuleId,
        outcome: ActivationOutcome,
    },
    InstallStates {
        module: ModuleId,
        states: Vec<InstallState>,
    },
    Modules {
        modules: Vec<ModuleId>,
    },
    Success {
        message: String,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render one install state as it is published.
    ///
    /// Silent in JSON mode; the final result carries what matters there.
    pub fn render_state(&self, module: &ModuleId, state: &InstallState) {
        if self.json_output {
            return;
        }
        let line = match state {
            InstallState::Pending => format!("⏳ {module}: waiting to start"),
            InstallState::Downloading { progress } => {
                format!("📥 {module}: downloading {}", progress_bar(*progress))
            }
            InstallState::Installing => format!("📦 {module}: installing"),
            InstallState::Installed => self.paint(&format!("✅ {module}: installed"), Color::Green),
            InstallState::Failed { .. } => self.paint(&format!("❌ {module}: {state}"), Color::Red),
            InstallState::Canceled => self.paint(&format!("🚫 {module}: canceled"), Color::Yellow),
            InstallState::RequiresConfirmation { session_id } => self.paint(
                &format!("⚠️  {module}: waiting for user confirmation (session {session_id})"),
                Color::Yellow,
            ),
        };
        println!("{line}");
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render as JSON
    fn render_json(&self, result: &CommandResult) -> io::Result<()> {
        let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted text
    fn render_table(&self, result: &CommandResult) -> io::Result<()> {
        match result {
            CommandResult::Activation {
                subject,
                module,
                outcome,
            } => self.render_outcome(subject, module, outcome),
            CommandResult::InstallStates { module, states } => {
                self.render_install_summary(module, states)
            }
            CommandResult::Modules { modules } => self.render_module_list(modules),
            CommandResult::Success { message } => {
                println!("{message}");
                Ok(())
            }
        }
    }

    fn render_outcome(
        &self,
        subject: &SubjectId,
        module: &ModuleId,
        outcome: &ActivationOutcome,
    ) -> io::Result<()> {
        let icon = if outcome.is_activated() { "[OK]" } else { "[ERROR]" };
        println!(
            "{icon} {} for {}: {outcome}",
            self.style_bold(module.as_str()),
            self.style_bold(subject.as_str())
        );
        Ok(())
    }

    fn render_install_summary(&self, module: &ModuleId, states: &[InstallState]) -> io::Result<()> {
        match states.last() {
            Some(last) if last.is_terminal() => {
                println!(
                    "{}: {last} after {} states",
                    self.style_bold(module.as_str()),
                    states.len()
                );
            }
            Some(last) => println!(
                "{}: stopped at {last} without finishing",
                self.style_bold(module.as_str())
            ),
            None => println!("{}: no install states received", self.style_bold(module.as_str())),
        }
        Ok(())
    }

    fn render_module_list(&self, modules: &[ModuleId]) -> io::Result<()> {
        if modules.is_empty() {
            println!("No modules installed.");
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Module").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
        ]);

        for module in modules {
            table.add_row(vec![
                Cell::new(module.as_str()),
                Cell::new("Installed").fg(Color::Green),
            ]);
        }

        println!("{table}");
        Ok(())
    }

    fn style_bold(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if !self.supports_color() {
            return text.to_string();
        }
        let style = match color {
            Color::Green => Style::new().green(),
            Color::Red => Style::new().red(),
            Color::Yellow => Style::new().yellow(),
            _ => Style::new(),
        };
        style.apply_to(text).to_string()
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

/// Fixed-width text progress bar, e.g. `[#####-----]  50%`
fn progress_bar(progress: u8) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(progress.min(100)) * WIDTH / 100;
    format!(
        "[{}{}] {progress:>3}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled)
    )
}
