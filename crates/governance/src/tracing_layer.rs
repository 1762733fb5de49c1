//! Logging configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xs_core::{Error, Result};

/// Configure stderr logging.
///
/// Answers go to stdout, so the default filter stays at `warn` unless
/// `RUST_LOG` says otherwise or `verbose` is set.
pub fn configure_tracing(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "info,xs=debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to install tracing subscriber: {}", e)))?;

    Ok(())
}
