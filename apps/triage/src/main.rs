//! triage - scripted diagnostics collection
//!
//! Parses a triage script, executes its actions against every target
//! machine, and packages the collected output into a gzip tar archive.

mod cli;
mod config;
mod display;
mod logging;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::fs;
use tracing::{error, info};
use triage_errors::Error;
use triage_exec::{Engine, EngineOptions, RetryPolicy};
use triage_script::Script;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("run failed: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::load_or_default(cli.global.config.as_deref()).await?;

    match cli.command {
        Commands::Check { script } => {
            let parsed = load_script(&script).await?;
            display::render_check(&parsed, cli.global.json)
        }
        Commands::Run {
            script,
            output,
            workdir,
            env,
            timeout,
            retries,
        } => {
            let parsed = load_script(&script).await?;
            info!(
                script = %script.display(),
                machines = parsed.from.machines.len(),
                actions = parsed.actions.len(),
                "executing script"
            );

            let options = EngineOptions {
                workdir: workdir.or_else(|| config.run.workdir.clone()),
                output: output.or_else(|| config.run.output.clone()),
                extra_env: parse_env_pairs(&env)?,
                retry: RetryPolicy::with_max_attempts(
                    retries.unwrap_or(config.run.retries),
                ),
                collector: None,
            };

            let engine = Engine::new(parsed, options);
            let report = match timeout.or(config.run.timeout_seconds) {
                Some(seconds) => {
                    tokio::time::timeout(Duration::from_secs(seconds), engine.execute())
                        .await
                        .map_err(|_| Error::Cancelled)??
                }
                None => engine.execute().await?,
            };

            display::render_report(&report, cli.global.json)
        }
    }
}

async fn load_script(path: &PathBuf) -> Result<Script, Error> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    Script::parse(&text)
}

fn parse_env_pairs(pairs: &[String]) -> Result<Vec<(String, String)>, Error> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| Error::internal(format!("--env needs KEY=VALUE, got {pair}")))
        })
        .collect()
}
