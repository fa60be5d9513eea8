//! Host-side utilities.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide tracing subscriber.
///
/// Embedders supply a non-blocking writer (typically from
/// `tracing_appender`) so a slow log sink never stalls request tasks
/// that are mid-stream on a client connection.
pub fn register_tracing(writer: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false),
        )
        .try_init();
}

/// Convenience initialization that logs to stderr.
///
/// Returns the worker guard; dropping it flushes and stops the
/// background writer, so hold it for the lifetime of the process.
pub fn init_stderr_tracing(env_filter: EnvFilter) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    register_tracing(writer, env_filter);
    guard
}
