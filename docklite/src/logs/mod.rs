//! Log storage collaborator boundary.
//!
//! The daemon does not own log storage; a log driver does. The
//! streaming subsystem sees it as an abstract capability: open a
//! [`LogCursor`], get back a [`LogReader`] that can be drained into the
//! request's channel writers and that respects the stop signal. A
//! reference driver for the `json-file` on-disk format lives in
//! [`json_file`].

use crate::stream::cancel::StopSignal;
use crate::stream::mux::ChannelWriter;
use async_trait::async_trait;
use docklite_shared::{DockliteResult, Tail};
use std::path::PathBuf;

pub mod json_file;

pub use json_file::JsonFileLogSource;

/// Resolved read configuration for one streaming request.
///
/// Built once by the attachment engine from the request and the
/// container's runtime state; immutable thereafter.
#[derive(Debug, Clone)]
pub struct LogCursor {
    /// Where the container's log driver stores its output.
    pub log_path: PathBuf,

    /// Runtime namespace of the container.
    pub namespace: String,

    /// Effective follow flag: the caller asked to follow AND the
    /// container was running at attach time.
    pub follow: bool,

    pub tail: Tail,

    /// Lower time bound (Unix seconds). `None` replays the full
    /// history; the engine sets it to "now" for follow-only requests.
    pub since: Option<i64>,

    /// Upper time bound (Unix seconds), if any.
    pub until: Option<i64>,

    /// Prefix every entry with its RFC 3339 timestamp.
    pub timestamps: bool,
}

/// A log driver that can open readers for stored container output.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(&self, cursor: &LogCursor) -> DockliteResult<Box<dyn LogReader>>;
}

/// An open view of one container's output.
#[async_trait]
pub trait LogReader: Send {
    /// Copy log data into the selected writers until the source is
    /// exhausted (non-follow) or the stop signal fires (follow).
    ///
    /// Entries for a channel whose writer is `None` are skipped. The
    /// implementation must suspend on "more data or stop, whichever is
    /// ready first" so a pushed signal is noticed before the next write.
    async fn drain(
        &mut self,
        stdout: Option<ChannelWriter>,
        stderr: Option<ChannelWriter>,
        stop: StopSignal,
    ) -> DockliteResult<()>;
}
