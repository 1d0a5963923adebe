//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// triage - scripted diagnostics collection
#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect diagnostics from local and remote machines into an archive")]
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

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Execute a script and package the results
    Run {
        /// Path to the script file
        script: PathBuf,

        /// Archive path (overrides the script's OUTPUT)
        #[arg(short, long, env = "TRIAGE_OUTPUT")]
        output: Option<PathBuf>,

        /// Root output directory (overrides the script's WORKDIR)
        #[arg(short, long, env = "TRIAGE_WORKDIR")]
        workdir: Option<PathBuf>,

        /// Extra KEY=VALUE environment entries, applied after ENV
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Whole-run timeout in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Attempts for SSH dials and SCP transfers
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Parse and validate a script without executing it
    Check {
        /// Path to the script file
        script: PathBuf,
    },
}
