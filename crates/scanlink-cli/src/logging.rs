//! Logging initialization for the CLI.
//!
//! Logs go to stderr so subcommand JSON output on stdout stays clean for
//! piping. Level defaults to `warn` and is controlled via `SCANLINK_LOG`
//! or `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed.
pub fn init() -> anyhow::Result<()> {
    let log_level = std::env::var("SCANLINK_LOG").unwrap_or_else(|_| "warn".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();

    Ok(())
}
