//! Log attachment engine.
//!
//! Orchestrates one attach or logs request end to end: seizes the
//! client connection, negotiates the wire contract, resolves the
//! container and its log location, arms the liveness watchers, and
//! drives bytes from the log source into the connection until the
//! source is exhausted or the stop signal fires.

use crate::logs::{LogCursor, LogSource};
use crate::runtime::ContainerRuntime;
use crate::stream::cancel::{self, StopSignal};
use crate::stream::hijack::{ConnectionHijacker, HijackedConnection};
use crate::stream::mux::StreamChannel;
use chrono::Utc;
use docklite_shared::{ApiVersion, AttachRequest, DockliteError, DockliteResult, LogsRequest, Tail};
use std::sync::Arc;
use std::time::Duration;

/// Tuning for the streaming subsystem.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// How long to wait after deleting a finished task before pushing
    /// the stop signal, giving the log pipeline time to flush buffered
    /// output. Too short loses trailing partial lines; too long slows
    /// every follow-mode shutdown by the same amount.
    pub flush_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(100),
        }
    }
}

/// Normalized form shared by the attach and logs entry points.
#[derive(Debug, Clone)]
struct StreamRequest {
    container_id: String,
    stdout: bool,
    stderr: bool,
    /// Replay buffered history before (or instead of) live output.
    replay: bool,
    /// Follow live output as it is produced.
    follow: bool,
    tail: Tail,
    since: Option<i64>,
    until: Option<i64>,
    timestamps: bool,
    upgrade: bool,
    api_version: ApiVersion,
}

/// Handler for the `attach` and `logs` container endpoints.
pub struct StreamService {
    runtime: Arc<dyn ContainerRuntime>,
    log_source: Arc<dyn LogSource>,
    config: StreamConfig,
}

impl StreamService {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        log_source: Arc<dyn LogSource>,
        config: StreamConfig,
    ) -> Self {
        Self {
            runtime,
            log_source,
            config,
        }
    }

    /// Bridge a client connection to a container's output
    /// (`POST /containers/{id}/attach`).
    pub async fn attach(
        &self,
        hijacker: Box<dyn ConnectionHijacker>,
        req: AttachRequest,
    ) -> DockliteResult<()> {
        if req.stdin {
            tracing::debug!(
                container = %req.container_id,
                "stdin attach requested; input forwarding is not implemented"
            );
        }
        self.stream(
            hijacker,
            StreamRequest {
                container_id: req.container_id,
                stdout: req.stdout,
                stderr: req.stderr,
                replay: req.logs,
                follow: req.stream,
                tail: Tail::All,
                since: None,
                until: None,
                timestamps: false,
                upgrade: req.upgrade,
                api_version: req.api_version,
            },
        )
        .await
    }

    /// Return a container's historical and/or live output
    /// (`GET /containers/{id}/logs`).
    pub async fn logs(
        &self,
        hijacker: Box<dyn ConnectionHijacker>,
        req: LogsRequest,
    ) -> DockliteResult<()> {
        self.stream(
            hijacker,
            StreamRequest {
                container_id: req.container_id,
                stdout: req.stdout,
                stderr: req.stderr,
                replay: true,
                follow: req.follow,
                tail: req.tail,
                since: req.since,
                until: req.until,
                timestamps: req.timestamps,
                upgrade: req.upgrade,
                api_version: req.api_version,
            },
        )
        .await
    }

    /// Drive one streaming request.
    ///
    /// The connection is seized unconditionally, before the container
    /// lookup. An `Err` from this function therefore means ownership was
    /// never taken (hijack or probe failure) and the caller still owns
    /// the conventional HTTP response path. Every failure after that
    /// point is reported on the connection itself - as an error status
    /// line before the success line is announced, or logged and dropped
    /// once streaming has begun - and the connection is closed on every
    /// exit path.
    async fn stream(
        &self,
        hijacker: Box<dyn ConnectionHijacker>,
        req: StreamRequest,
    ) -> DockliteResult<()> {
        let io = hijacker.hijack().await?;
        let (mut conn, reader) =
            HijackedConnection::new(io, req.upgrade, req.api_version).await?;

        let stop = StopSignal::new();
        let client_watcher =
            cancel::spawn_client_watcher(reader, conn.shared_writer(), stop.clone());

        match self.prepare_and_copy(&mut conn, &req, &stop).await {
            Ok(()) => {}
            Err(err) if !conn.is_announced() => {
                tracing::debug!(
                    container = %req.container_id,
                    error = %err,
                    "stream setup failed; reporting on the hijacked connection"
                );
                if let Err(write_err) = conn.write_error(&err).await {
                    tracing::warn!(error = %write_err, "failed to write error response");
                }
            }
            Err(err) => {
                tracing::error!(
                    container = %req.container_id,
                    error = %err,
                    "stream aborted mid-flight"
                );
            }
        }

        stop.signal();
        conn.close().await;
        if let Err(err) = client_watcher.await {
            tracing::debug!(error = %err, "client watcher task failed");
        }
        Ok(())
    }

    async fn prepare_and_copy(
        &self,
        conn: &mut HijackedConnection,
        req: &StreamRequest,
        stop: &StopSignal,
    ) -> DockliteResult<()> {
        let container = match self.runtime.lookup(&req.container_id).await {
            Err(DockliteError::NotFound(_)) => {
                return Err(DockliteError::NotFound(format!(
                    "no container is found given the string: {}",
                    req.container_id
                )));
            }
            other => other?,
        };

        // The caller only wants to confirm the connection can be
        // established; no data is ever sent.
        if !req.replay && !req.follow {
            return conn.announce().await;
        }

        if !req.stdout && !req.stderr {
            return Err(DockliteError::InvalidArgument(
                "you must choose at least one stream".into(),
            ));
        }

        let stdout = req
            .stdout
            .then(|| conn.channel_writer(StreamChannel::Stdout));
        let stderr = req
            .stderr
            .then(|| conn.channel_writer(StreamChannel::Stderr));

        // Replay window: full requested history, or only output produced
        // from this point on.
        let since = if req.replay {
            req.since
        } else {
            Some(Utc::now().timestamp())
        };

        let log_config = container.log_config()?;

        let running = container.status.is_running();
        let follow = req.follow && running && container.task.is_some();

        if !running && container.status.is_stopped() {
            // No task-exit event will ever fire for this container, so
            // flush its buffered output up front.
            if let Some(task) = &container.task {
                cancel::flush_task_buffers(task.as_ref(), self.config.flush_delay).await;
            }
        }

        if follow {
            if let Some(task) = container.task.clone() {
                cancel::spawn_task_watcher(task, stop.clone(), self.config.flush_delay);
            }
        }

        let cursor = LogCursor {
            log_path: log_config.log_path,
            namespace: container.namespace.clone(),
            follow,
            tail: req.tail,
            since,
            until: req.until,
            timestamps: req.timestamps,
        };
        let mut log_reader = self.log_source.open(&cursor).await?;

        conn.announce().await?;
        log_reader.drain(stdout, stderr, stop.clone()).await
    }
}
