//! Docklite shared types
//!
//! Common types used by both the daemon core (docklite) and the HTTP
//! routing layer in front of it: the error taxonomy, the negotiated API
//! version, stream request types, and wire-level constants.

pub mod api;
pub mod constants;
pub mod errors;
pub mod version;

pub use api::{AttachRequest, LogsRequest, Tail};
pub use errors::{DockliteError, DockliteResult};
pub use version::ApiVersion;
