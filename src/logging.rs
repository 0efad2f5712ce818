//! Logging setup
//!
//! Filtering follows `RUST_LOG`; without it only this crate's `info` and
//! above are shown. Both initializers can be called more than once; calls
//! after the first subscriber is installed leave it in place.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "cursor_agent_sdk=info";
const LOG_FILE_PREFIX: &str = "cursor-agent.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log to stderr
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("[Logging] Subscriber installed");
    }
}

/// Log to stderr and to a daily-rotated file in `dir`
///
/// Keep the returned guard alive for as long as logging is needed; dropping
/// it flushes and stops the file writer.
pub fn init_logging_with_file(dir: impl AsRef<Path>) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir.as_ref(), LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("[Logging] Writing logs to {}", dir.as_ref().display());
    }
    guard
}
