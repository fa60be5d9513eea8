//! Stream request types.
//!
//! Immutable inputs to the streaming subsystem, built by the HTTP layer
//! from the query string of an `attach` or `logs` request plus the
//! negotiated API version. One instance is created per request and
//! discarded when the request completes.

use crate::errors::DockliteError;
use crate::version::ApiVersion;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Tail selection for log replay: the full history or the last N entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tail {
    #[default]
    All,
    Last(u64),
}

impl FromStr for Tail {
    type Err = DockliteError;

    /// Docker accepts `"all"`, the empty string, or a non-negative
    /// integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(Tail::All),
            n => n
                .parse::<u64>()
                .map(Tail::Last)
                .map_err(|_| DockliteError::InvalidArgument(format!("invalid tail value: {n}"))),
        }
    }
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tail::All => write!(f, "all"),
            Tail::Last(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Tail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tail {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Request to bridge a client connection to a container's output
/// (`POST /containers/{id}/attach`).
///
/// `logs` asks for buffered history to be replayed, `stream` asks to
/// follow live output; either, both, or neither may be set. `stdin` is
/// accepted for wire compatibility but input forwarding is not
/// implemented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachRequest {
    pub container_id: String,
    #[serde(default)]
    pub stdin: bool,
    #[serde(default)]
    pub stdout: bool,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default)]
    pub logs: bool,
    #[serde(default)]
    pub stream: bool,
    /// Whether the client asked for a connection upgrade
    /// (`Upgrade: tcp`).
    #[serde(default)]
    pub upgrade: bool,
    #[serde(default)]
    pub api_version: ApiVersion,
}

/// Request for a container's historical and/or live output
/// (`GET /containers/{id}/logs`).
///
/// Logs always replay history; `follow` additionally streams new output
/// as it is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsRequest {
    pub container_id: String,
    #[serde(default)]
    pub stdout: bool,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default)]
    pub follow: bool,
    /// Only entries at or after this Unix timestamp (seconds).
    #[serde(default)]
    pub since: Option<i64>,
    /// Only entries at or before this Unix timestamp (seconds).
    #[serde(default)]
    pub until: Option<i64>,
    /// Prefix each entry with its RFC 3339 timestamp.
    #[serde(default)]
    pub timestamps: bool,
    #[serde(default)]
    pub tail: Tail,
    #[serde(default)]
    pub upgrade: bool,
    #[serde(default)]
    pub api_version: ApiVersion,
}
