//! Error types shared across docklite crates.

use thiserror::Error;

pub type DockliteResult<T> = Result<T, DockliteError>;

/// Error taxonomy for the daemon core.
///
/// The display string of `NotFound`, `Conflict` and `InvalidArgument` is
/// written verbatim onto hijacked connections, so variants carry the full
/// client-facing message rather than a wrapped cause.
#[derive(Debug, Error)]
pub enum DockliteError {
    /// Requested object does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Operation conflicts with the object's current state.
    #[error("{0}")]
    Conflict(String),

    /// Caller supplied an invalid parameter.
    #[error("{0}")]
    InvalidArgument(String),

    /// Container metadata extension could not be decoded.
    #[error("metadata: {0}")]
    Metadata(String),

    /// Transport-level failure on a streaming connection.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Internal failure with no more specific classification.
    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for DockliteError {
    fn from(err: serde_json::Error) -> Self {
        DockliteError::Metadata(err.to_string())
    }
}

impl DockliteError {
    /// Status code and reason phrase used when this error is rendered as a
    /// raw status line on a hijacked connection.
    pub fn http_status(&self) -> (u16, &'static str) {
        match self {
            DockliteError::NotFound(_) => (404, "Not Found"),
            DockliteError::Conflict(_) => (409, "Conflict"),
            DockliteError::InvalidArgument(_) => (400, "Bad Request"),
            _ => (500, "Internal Server Error"),
        }
    }
}
