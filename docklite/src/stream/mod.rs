//! Live container output streaming.
//!
//! The subsystem behind the `attach` and `logs` endpoints. A request
//! flows through four pieces:
//!
//! - [`hijack`] takes exclusive ownership of the client connection and
//!   fixes the wire contract (status line, content type, framing);
//! - [`mux`] frames stdout and stderr onto the one connection when
//!   multiplexing was negotiated;
//! - [`cancel`] runs the client-liveness and task-liveness watchers that
//!   feed the per-request stop signal;
//! - [`service`] orchestrates: it resolves the container and its log
//!   location, arms the watchers, announces success, and drives bytes
//!   from the log source into the connection until one of the three
//!   parties - client, task, or source - ends.

pub mod cancel;
pub mod hijack;
pub mod mux;
pub mod service;

pub use cancel::StopSignal;
pub use hijack::{
    ConnectionHijacker, ConnectionReader, HijackedConnection, RawStream, StreamFormat,
};
pub use mux::{ChannelWriter, Frame, FrameDecoder, StreamChannel, FRAME_HEADER_LEN};
pub use service::{StreamConfig, StreamService};
