//! Docklite - Docker Engine API on an alternate container runtime
//!
//! Docklite re-implements the Docker Engine HTTP API on top of a
//! different underlying container runtime so existing Docker client
//! tooling works unmodified. This crate is the daemon's core: the live
//! container output streaming subsystem behind the `attach` and `logs`
//! endpoints, plus the collaborator boundaries it is driven through.
//!
//! The HTTP routing/versioning layer and container lifecycle management
//! live in the daemon binary built on top of this crate; they hand each
//! streaming request to [`StreamService`] together with a
//! [`stream::ConnectionHijacker`] for the client connection.

pub mod logs;
pub mod runtime;
pub mod stream;
pub mod util;

pub use docklite_shared::{
    ApiVersion, AttachRequest, DockliteError, DockliteResult, LogsRequest, Tail,
};
pub use stream::{StreamConfig, StreamService};
