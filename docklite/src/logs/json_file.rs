//! Reference reader for the `json-file` log driver.
//!
//! The driver stores one JSON object per line:
//!
//! ```text
//! {"log":"hello\n","stream":"stdout","time":"2024-05-01T10:00:00.000000000Z"}
//! ```
//!
//! Replay reads whatever is on disk, bounded by the cursor's tail and
//! time window. Follow mode then polls the file for appended complete
//! lines until the stop signal fires; a trailing newline-less fragment
//! is held back until the rest of the line lands.

use super::{LogCursor, LogReader, LogSource};
use crate::stream::cancel::StopSignal;
use crate::stream::mux::ChannelWriter;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use docklite_shared::{DockliteError, DockliteResult, Tail};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One line of the on-disk log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub log: String,
    pub stream: String,
    pub time: DateTime<Utc>,
}

/// Log source backed by `json-file` driver output on local disk.
#[derive(Debug, Clone)]
pub struct JsonFileLogSource {
    poll_interval: Duration,
}

impl JsonFileLogSource {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override how often follow mode checks the file for new output.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for JsonFileLogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSource for JsonFileLogSource {
    async fn open(&self, cursor: &LogCursor) -> DockliteResult<Box<dyn LogReader>> {
        let file = File::open(&cursor.log_path).await.map_err(|err| {
            DockliteError::Internal(format!(
                "failed to open log file {}: {}",
                cursor.log_path.display(),
                err
            ))
        })?;
        Ok(Box::new(JsonFileReader {
            file,
            cursor: cursor.clone(),
            poll_interval: self.poll_interval,
            carry: String::new(),
        }))
    }
}

struct JsonFileReader {
    file: File,
    cursor: LogCursor,
    poll_interval: Duration,
    /// Trailing partial line not yet terminated by a newline.
    carry: String,
}

#[async_trait]
impl LogReader for JsonFileReader {
    async fn drain(
        &mut self,
        stdout: Option<ChannelWriter>,
        stderr: Option<ChannelWriter>,
        stop: StopSignal,
    ) -> DockliteResult<()> {
        // Replay everything already on disk, bounded by the tail count.
        let mut contents = String::new();
        self.file.read_to_string(&mut contents).await?;
        let complete_len = contents.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
        self.carry = contents[complete_len..].to_string();

        let mut replay: VecDeque<JsonLogEntry> = VecDeque::new();
        for line in contents[..complete_len].lines() {
            let entry = match parse_line(line) {
                Some(entry) => entry,
                None => continue,
            };
            if !selected(&entry, &stdout, &stderr) || !in_window(&self.cursor, &entry) {
                continue;
            }
            replay.push_back(entry);
            if let Tail::Last(n) = self.cursor.tail {
                while replay.len() as u64 > n {
                    replay.pop_front();
                }
            }
        }
        for entry in &replay {
            emit(entry, &stdout, &stderr, self.cursor.timestamps).await?;
        }

        if !self.cursor.follow {
            return Ok(());
        }

        // Follow: poll for appended complete lines until stopped.
        let mut chunk = vec![0u8; 8192];
        loop {
            if stop.is_signalled() {
                return Ok(());
            }
            let n = self.file.read(&mut chunk).await?;
            if n == 0 {
                tokio::select! {
                    _ = stop.signalled() => return Ok(()),
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
                continue;
            }
            self.carry.push_str(&String::from_utf8_lossy(&chunk[..n]));
            while let Some(pos) = self.carry.find('\n') {
                let line: String = self.carry.drain(..=pos).collect();
                let entry = match parse_line(line.trim_end()) {
                    Some(entry) => entry,
                    None => continue,
                };
                if selected(&entry, &stdout, &stderr) && in_window(&self.cursor, &entry) {
                    emit(&entry, &stdout, &stderr, self.cursor.timestamps).await?;
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Option<JsonLogEntry> {
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(entry) => Some(entry),
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed log line");
            None
        }
    }
}

fn selected(
    entry: &JsonLogEntry,
    stdout: &Option<ChannelWriter>,
    stderr: &Option<ChannelWriter>,
) -> bool {
    match entry.stream.as_str() {
        "stdout" => stdout.is_some(),
        "stderr" => stderr.is_some(),
        other => {
            tracing::warn!(stream = %other, "skipping log entry for unknown stream");
            false
        }
    }
}

fn in_window(cursor: &LogCursor, entry: &JsonLogEntry) -> bool {
    let ts = entry.time.timestamp();
    if let Some(since) = cursor.since {
        if ts < since {
            return false;
        }
    }
    if let Some(until) = cursor.until {
        if ts > until {
            return false;
        }
    }
    true
}

async fn emit(
    entry: &JsonLogEntry,
    stdout: &Option<ChannelWriter>,
    stderr: &Option<ChannelWriter>,
    timestamps: bool,
) -> DockliteResult<()> {
    let writer = match entry.stream.as_str() {
        "stdout" => stdout.as_ref(),
        "stderr" => stderr.as_ref(),
        _ => None,
    };
    let writer = match writer {
        Some(writer) => writer,
        None => return Ok(()),
    };
    if timestamps {
        let line = format!(
            "{} {}",
            entry.time.to_rfc3339_opts(SecondsFormat::Nanos, true),
            entry.log
        );
        writer.write_chunk(line.as_bytes()).await
    } else {
        writer.write_chunk(entry.log.as_bytes()).await
    }
}
