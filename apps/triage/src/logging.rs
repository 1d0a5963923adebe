//! Tracing subscriber setup for the CLI

use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins when set; otherwise `--debug`
/// selects the debug level. Logs go to stderr so JSON output on stdout
/// stays clean.
pub fn init(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
