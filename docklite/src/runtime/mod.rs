//! Container runtime collaborator boundary.
//!
//! The streaming subsystem never drives the underlying runtime directly;
//! it sees containers through the small read-mostly surface defined
//! here. The only mutation it ever requests is [`TaskHandle::delete`],
//! part of the buffered-logger flush workaround in
//! [`crate::stream::cancel`].

use async_trait::async_trait;
use docklite_shared::constants::extensions;
use docklite_shared::{DockliteError, DockliteResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle status of a container, as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// Created and persisted, never started. No task exists.
    Created,

    /// Task is running and producing output.
    Running,

    /// Shutting down (transient state).
    Stopping,

    /// Task has exited. Metadata and logs are preserved.
    Stopped,

    /// Cannot determine container state (error recovery).
    Unknown,
}

impl ContainerStatus {
    /// Whether the task is currently producing output.
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerStatus::Running)
    }

    /// Whether the container has fully stopped, as opposed to a
    /// transient non-running state such as [`ContainerStatus::Stopping`].
    pub fn is_stopped(&self) -> bool {
        matches!(self, ContainerStatus::Stopped)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ContainerStatus::Stopping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Stopping => "stopping",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to a container's runtime task (its running process group).
///
/// Distinct from the container's persistent metadata: a task exists only
/// while the runtime tracks the process group, and survives as a
/// zombie-like record after exit until deleted.
#[async_trait]
pub trait TaskHandle: Send + Sync {
    /// Resolves when the task's process group exits. Resolves
    /// immediately for a task that has already exited.
    async fn wait(&self) -> DockliteResult<()>;

    /// Force-delete the task from the runtime. Deleting a task causes
    /// the runtime's logging pipeline to flush any buffered output.
    async fn delete(&self) -> DockliteResult<()>;
}

/// A resolved container, as seen by the streaming subsystem.
#[derive(Clone)]
pub struct ContainerHandle {
    pub id: String,

    /// Runtime namespace the container lives in.
    pub namespace: String,

    pub status: ContainerStatus,

    /// Extension blobs attached to the container's metadata, keyed by
    /// well-known identifiers.
    pub extensions: HashMap<String, serde_json::Value>,

    /// The container's task, if the runtime currently tracks one.
    pub task: Option<Arc<dyn TaskHandle>>,
}

impl ContainerHandle {
    /// Decode the log configuration stored in this container's metadata.
    pub fn log_config(&self) -> DockliteResult<LogConfig> {
        let blob = self.extensions.get(extensions::LOG_CONFIG).ok_or_else(|| {
            DockliteError::Metadata(format!(
                "container {} has no log configuration extension",
                self.id
            ))
        })?;
        Ok(serde_json::from_value(blob.clone())?)
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("status", &self.status)
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

/// Log configuration written into container metadata at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log driver name, e.g. `json-file`.
    pub driver: String,

    /// Where the driver stores this container's output.
    pub log_path: PathBuf,
}

/// Read access to the underlying container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Resolve a container by identifier.
    ///
    /// Returns [`DockliteError::NotFound`] when no container matches.
    async fn lookup(&self, id: &str) -> DockliteResult<ContainerHandle>;
}
