//! Wire-level constants for the streaming subsystem.
//!
//! These values are part of the Docker Engine API surface and must not
//! drift: existing client tooling matches on them byte for byte.

/// Stream content types advertised to clients.
pub mod stream {
    /// Content type for an unframed byte stream.
    pub const MEDIA_TYPE_RAW_STREAM: &str = "application/vnd.docker.raw-stream";

    /// Content type for the stdout/stderr multiplexed framing.
    pub const MEDIA_TYPE_MULTIPLEXED_STREAM: &str = "application/vnd.docker.multiplexed-stream";
}

/// Container metadata extension keys.
pub mod extensions {
    /// Extension blob holding a container's log configuration.
    pub const LOG_CONFIG: &str = "docklite/log-config";
}
