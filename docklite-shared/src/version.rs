//! Negotiated Docker Engine API version.
//!
//! The HTTP layer negotiates a version per request (from the `/vN.NN/`
//! path prefix or its default); the streaming subsystem only needs it to
//! pick the stream content type.

use crate::errors::DockliteError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `major.minor` Engine API version.
///
/// Ordering is numeric per component, so `1.5 < 1.42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
}

impl ApiVersion {
    /// First API version whose clients understand the
    /// `multiplexed-stream` content type on upgraded attach connections.
    pub const MULTIPLEXED_STREAM_MIN: ApiVersion = ApiVersion {
        major: 1,
        minor: 42,
    };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Whether clients at this version understand the multiplexed stream
    /// content type.
    pub fn supports_multiplexed_stream(&self) -> bool {
        *self >= Self::MULTIPLEXED_STREAM_MIN
    }
}

impl Default for ApiVersion {
    /// Oldest API version the daemon accepts.
    fn default() -> Self {
        ApiVersion::new(1, 24)
    }
}

impl FromStr for ApiVersion {
    type Err = DockliteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let (major, minor) = trimmed.split_once('.').ok_or_else(|| {
            DockliteError::InvalidArgument(format!("invalid API version: {s}"))
        })?;
        let parse = |part: &str| {
            part.parse::<u32>().map_err(|_| {
                DockliteError::InvalidArgument(format!("invalid API version: {s}"))
            })
        };
        Ok(ApiVersion {
            major: parse(major)?,
            minor: parse(minor)?,
        })
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
