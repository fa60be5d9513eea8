//! Per-request cancellation.
//!
//! Each streaming request owns one [`StopSignal`] fed by two independent
//! watchers: client liveness (the peer closed its side of the
//! connection) and task liveness (the container's process group exited).
//! Either watcher - or the engine's own teardown - may push the signal;
//! pushing is idempotent and the copy loop observes at most one
//! triggering event.
//!
//! Cancellation is advisory: pushing the signal does not interrupt an
//! in-flight read from the log source. The copy loop combines its wait
//! on the source with a wait on the signal and notices before its next
//! write.

use crate::runtime::TaskHandle;
use crate::stream::hijack::{ConnectionReader, SharedWriter};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Single-consumer, multi-producer stop primitive for one request.
///
/// A thin wrapper over a [`CancellationToken`]: clones share the same
/// signal, producers may race to push it, and exactly one triggering
/// event is observable.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the stop signal. Idempotent.
    pub fn signal(&self) {
        self.token.cancel();
    }

    pub fn is_signalled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been pushed, immediately if it
    /// already was.
    pub async fn signalled(&self) {
        self.token.cancelled().await;
    }
}

/// Watch for the client closing its side of the connection.
///
/// Attempts 1-byte reads on the connection's read half. End-of-stream
/// means the peer hung up: the stop signal is pushed and the local write
/// half is shut down. Normal data is discarded (input forwarding is not
/// implemented) and a read error ends the watcher without signalling -
/// the copy loop will hit the broken transport on its next write. The
/// watcher also exits when the stop signal fires, so it never outlives
/// its request.
pub(crate) fn spawn_client_watcher(
    mut reader: ConnectionReader,
    writer: SharedWriter,
    stop: StopSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut byte = [0u8; 1];
        loop {
            tokio::select! {
                _ = stop.signalled() => return,
                read = reader.read(&mut byte) => match read {
                    Ok(0) => {
                        tracing::debug!("client closed the connection");
                        stop.signal();
                        let mut writer = writer.lock().await;
                        if let Err(err) = writer.shutdown().await {
                            tracing::debug!(error = %err, "error closing connection after client disconnect");
                        }
                        return;
                    }
                    Ok(_) => {
                        tracing::trace!("discarding client input");
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "read error on client connection");
                        return;
                    }
                }
            }
        }
    })
}

/// Delete a finished task and give the log pipeline time to flush.
///
/// The runtime's logging pipeline may hold a short buffer of
/// not-yet-flushed, newline-less output that is only flushed when the
/// task is deleted. The delay lets that flush reach the log store before
/// the stop signal ends the copy loop; without it trailing partial
/// output can be lost. The interval is an empirically chosen constant,
/// not a measured bound (see `StreamConfig::flush_delay`).
pub(crate) async fn flush_task_buffers(task: &dyn TaskHandle, delay: Duration) {
    if let Err(err) = task.delete().await {
        tracing::warn!(error = %err, "failed to delete finished task");
    }
    tokio::time::sleep(delay).await;
}

/// Watch for the container's task exiting.
///
/// Armed only when the request is following live output on a running
/// container. When the task exits, the flush workaround runs and the
/// stop signal is pushed. Exits early without touching the task if the
/// request ends first.
pub(crate) fn spawn_task_watcher(
    task: Arc<dyn TaskHandle>,
    stop: StopSignal,
    flush_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = stop.signalled() => return,
            exit = task.wait() => {
                if let Err(err) = exit {
                    tracing::warn!(error = %err, "waiting for task exit failed");
                }
            }
        }
        flush_task_buffers(task.as_ref(), flush_delay).await;
        stop.signal();
    })
}
