//! Log output for the bridge binary.
//!
//! Everything goes to stderr or the log directory. Stdout is reserved for
//! the JSON lines that `start`, `status`, `contacts` print, so their output
//! can be piped straight into the host.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive for the lifetime of `start`.
///
/// Dropping it flushes buffered connection and send logs to disk.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Install logging for a running bridge.
///
/// Reconnects, login polls and refused sends are recorded as JSON in
/// `{logs_dir}/wxbridge.log.YYYY-MM-DD` (rotated daily) and echoed to
/// stderr. `RUST_LOG` selects the level; `info` shows every state
/// transition, `debug` adds per-frame and per-send detail.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "wxbridge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(default_filter())
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Stderr-only logging for `status`, `contacts`, and `send`.
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
