//! Shared fixtures for the streaming integration tests.

use async_trait::async_trait;
use docklite::runtime::{ContainerHandle, ContainerRuntime, ContainerStatus, TaskHandle};
use docklite::stream::{ConnectionHijacker, RawStream, StopSignal};
use docklite::{
    ApiVersion, AttachRequest, DockliteError, DockliteResult, LogsRequest, StreamConfig,
    StreamService, Tail,
};
use docklite_shared::constants::extensions;
use docklite::logs::JsonFileLogSource;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, DuplexStream};

/// Success head for a non-upgraded raw-stream response.
pub const RAW_200_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: application/vnd.docker.raw-stream\r\n\r\n";

/// Hijacker handing over one half of an in-memory duplex connection.
pub struct TestHijacker {
    io: DuplexStream,
}

impl TestHijacker {
    pub fn new(io: DuplexStream) -> Box<Self> {
        Box::new(Self { io })
    }
}

#[async_trait]
impl ConnectionHijacker for TestHijacker {
    async fn hijack(self: Box<Self>) -> DockliteResult<Box<dyn RawStream>> {
        Ok(Box::new(self.io))
    }
}

/// Hijacker whose seizure always fails, modelling a connection the HTTP
/// layer cannot give up.
pub struct FailingHijacker;

#[async_trait]
impl ConnectionHijacker for FailingHijacker {
    async fn hijack(self: Box<Self>) -> DockliteResult<Box<dyn RawStream>> {
        Err(DockliteError::Internal(
            "connection cannot be seized".into(),
        ))
    }
}

/// Task whose exit is triggered by the test; records delete calls.
pub struct FakeTask {
    exit: StopSignal,
    deletes: AtomicUsize,
}

impl FakeTask {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            exit: StopSignal::new(),
            deletes: AtomicUsize::new(0),
        })
    }

    pub fn trigger_exit(&self) {
        self.exit.signal();
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskHandle for FakeTask {
    async fn wait(&self) -> DockliteResult<()> {
        self.exit.signalled().await;
        Ok(())
    }

    async fn delete(&self) -> DockliteResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory container runtime.
#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<HashMap<String, ContainerHandle>>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, container: ContainerHandle) {
        self.containers
            .lock()
            .unwrap()
            .insert(container.id.clone(), container);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn lookup(&self, id: &str) -> DockliteResult<ContainerHandle> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| DockliteError::NotFound(format!("no such container: {id}")))
    }
}

/// Build a container whose log configuration points at `log_path`.
pub fn container(
    id: &str,
    status: ContainerStatus,
    log_path: &Path,
    task: Option<Arc<FakeTask>>,
) -> ContainerHandle {
    let mut ext = HashMap::new();
    ext.insert(
        extensions::LOG_CONFIG.to_string(),
        serde_json::json!({"driver": "json-file", "log_path": log_path}),
    );
    ContainerHandle {
        id: id.into(),
        namespace: "default".into(),
        status,
        extensions: ext,
        task: task.map(|t| t as Arc<dyn TaskHandle>),
    }
}

/// A service over the fake runtime and the json-file log source, tuned
/// for fast tests.
pub fn service(runtime: Arc<FakeRuntime>, flush_delay: Duration) -> StreamService {
    StreamService::new(
        runtime,
        Arc::new(JsonFileLogSource::with_poll_interval(Duration::from_millis(
            10,
        ))),
        StreamConfig { flush_delay },
    )
}

pub fn log_line(stream: &str, msg: &str, time: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({"log": msg, "stream": stream, "time": time})
    )
}

pub fn write_log(path: &Path, lines: &[String]) {
    std::fs::write(path, lines.concat()).unwrap();
}

pub fn append_log(path: &Path, line: &str) {
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(line.as_bytes()).unwrap();
}

/// Logs request with both channels selected and no upgrade.
pub fn logs_request(id: &str) -> LogsRequest {
    LogsRequest {
        container_id: id.into(),
        stdout: true,
        stderr: true,
        follow: false,
        since: None,
        until: None,
        timestamps: false,
        tail: Tail::All,
        upgrade: false,
        api_version: ApiVersion::new(1, 43),
    }
}

/// Attach request with both output channels selected and no upgrade.
pub fn attach_request(id: &str) -> AttachRequest {
    AttachRequest {
        container_id: id.into(),
        stdin: false,
        stdout: true,
        stderr: true,
        logs: false,
        stream: false,
        upgrade: false,
        api_version: ApiVersion::new(1, 43),
    }
}

pub async fn read_exact_bytes(client: &mut DuplexStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    client.read_exact(&mut buf).await.unwrap();
    buf
}

pub async fn read_to_eof(client: &mut DuplexStream) -> Vec<u8> {
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();
    buf
}
