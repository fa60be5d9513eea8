//! Stdout/stderr stream multiplexing.
//!
//! When a connection carries both stdout and stderr, each write is
//! wrapped in a small self-describing frame so the client can split the
//! channels back apart:
//!
//! ```text
//! byte 0      channel tag (1 = stdout, 2 = stderr)
//! bytes 1-3   reserved, zero
//! bytes 4-7   big-endian u32 payload length
//! bytes 8..   payload, unmodified
//! ```
//!
//! The layout is wire-compatible with Docker's `stdcopy` framing;
//! existing clients de-multiplex it unchanged. In raw mode no framing is
//! applied and the two channels are indistinguishable on the wire.

use crate::stream::hijack::{SharedWriter, StreamFormat};
use docklite_shared::{DockliteError, DockliteResult};
use tokio::io::AsyncWriteExt;

/// Size of the frame header preceding each multiplexed payload.
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload a single frame can describe.
const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// Output channel of a container process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamChannel {
    Stdout = 1,
    Stderr = 2,
}

impl StreamChannel {
    /// Wire tag carried in byte 0 of a frame header.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(StreamChannel::Stdout),
            2 => Some(StreamChannel::Stderr),
            _ => None,
        }
    }
}

/// Encode one payload as a single frame.
///
/// The caller must keep `payload` within [`MAX_FRAME_PAYLOAD`];
/// [`ChannelWriter::write_chunk`] splits larger chunks across frames.
fn encode_frame(channel: StreamChannel, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.push(channel.tag());
    frame.extend_from_slice(&[0, 0, 0]);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Writer for one output channel of one streaming connection.
///
/// Cheap to clone; clones share the underlying connection. In
/// multiplexed mode every chunk is written as a complete frame under a
/// single lock hold, so frames from stdout and stderr never interleave
/// on the wire.
#[derive(Clone)]
pub struct ChannelWriter {
    conn: SharedWriter,
    channel: StreamChannel,
    format: StreamFormat,
}

impl ChannelWriter {
    pub(crate) fn new(conn: SharedWriter, channel: StreamChannel, format: StreamFormat) -> Self {
        Self {
            conn,
            channel,
            format,
        }
    }

    pub fn channel(&self) -> StreamChannel {
        self.channel
    }

    /// Write one chunk of container output to the connection.
    pub async fn write_chunk(&self, payload: &[u8]) -> DockliteResult<()> {
        match self.format {
            StreamFormat::Raw => {
                if payload.is_empty() {
                    return Ok(());
                }
                let mut conn = self.conn.lock().await;
                conn.write_all(payload).await?;
                conn.flush().await?;
            }
            StreamFormat::Multiplexed => {
                let mut conn = self.conn.lock().await;
                if payload.is_empty() {
                    conn.write_all(&encode_frame(self.channel, payload)).await?;
                } else {
                    for part in payload.chunks(MAX_FRAME_PAYLOAD) {
                        conn.write_all(&encode_frame(self.channel, part)).await?;
                    }
                }
                conn.flush().await?;
            }
        }
        Ok(())
    }
}

/// A decoded multiplexed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel: StreamChannel,
    pub payload: Vec<u8>,
}

/// Incremental decoder for the multiplexed framing.
///
/// Feed arbitrary byte slices as they arrive and pull complete frames
/// out; partial frames are buffered until the rest shows up. Used by
/// clients of the daemon and by the test suite.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete frame out of the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed, and an error on an
    /// unknown channel tag (the stream is unrecoverable at that point).
    pub fn next_frame(&mut self) -> DockliteResult<Option<Frame>> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let channel = StreamChannel::from_tag(self.buf[0]).ok_or_else(|| {
            DockliteError::Internal(format!("unknown stream channel tag: {}", self.buf[0]))
        })?;
        let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        if self.buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }
        let payload = self.buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len].to_vec();
        self.buf.drain(..FRAME_HEADER_LEN + len);
        Ok(Some(Frame { channel, payload }))
    }
}
