use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

/// Logs always go to stderr; stdout carries the protocol.
pub fn init(log_level: &str, format: LogFormat) {
    // Prefer explicit --log-level; allow RUST_LOG override.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
