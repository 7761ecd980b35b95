//! Command line interface definition

use clap::{Parser, Subcommand};
use crikstats_types::ColorChoice;
use std::path::PathBuf;

/// crikstats - On-demand player statistics module delivery
#[derive(Parser)]
#[command(name = "crikstats")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "On-demand player statistics module delivery")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the crikstats log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Open player statistics, installing the feature module first if needed
    Open {
        /// Player whose statistics are shown
        subject: String,

        /// Module carrying the statistics screen (defaults to config)
        #[arg(long, value_name = "ID")]
        module: Option<String>,
    },

    /// Install a module and print every state it goes through
    #[command(alias = "i")]
    Install {
        /// Module identifier
        module: String,
    },

    /// List installed modules
    #[command(alias = "ls")]
    Modules,

    /// Ask the delivery service to remove a module later
    #[command(alias = "rm")]
    Uninstall {
        /// Module identifier
        module: String,
    },
}
