//! Connection takeover and protocol negotiation.
//!
//! An attach or logs request starts life as an ordinary HTTP exchange,
//! but its response is a raw byte stream of unbounded length. The HTTP
//! layer therefore hands the underlying connection over to this module,
//! which decides the wire contract - status line, content type, and
//! whether stdout/stderr share the connection through the multiplexed
//! framing - before any container output flows.
//!
//! The success response is deliberately not written at takeover time.
//! [`HijackedConnection::announce`] is called by the attachment engine
//! only once it is ready to stream, so a failure discovered after
//! takeover (a missing container, unreadable metadata) can still be
//! rendered as an error status line on the same connection.

use crate::stream::mux::{ChannelWriter, StreamChannel};
use async_trait::async_trait;
use docklite_shared::constants::stream as stream_const;
use docklite_shared::{ApiVersion, DockliteError, DockliteResult};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;

/// A raw bidirectional byte transport seized from the HTTP layer.
pub trait RawStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RawStream for T {}

/// Read side of a hijacked connection, consumed by the client-liveness
/// watcher.
pub type ConnectionReader = ReadHalf<Box<dyn RawStream>>;

/// Write side of a hijacked connection, shared between the success/error
/// response writer, the channel writers, and the client-liveness watcher
/// (which shuts it down on disconnect).
pub(crate) type SharedWriter = Arc<Mutex<WriteHalf<Box<dyn RawStream>>>>;

/// The HTTP layer's capability to give up a request's connection.
///
/// Consuming `self` models the one-way ownership transfer: once
/// `hijack` returns `Ok`, the HTTP layer no longer writes a response and
/// the connection belongs exclusively to the streaming subsystem. On
/// `Err` ownership was never transferred and the caller still owns the
/// conventional response path.
#[async_trait]
pub trait ConnectionHijacker: Send {
    async fn hijack(self: Box<Self>) -> DockliteResult<Box<dyn RawStream>>;
}

/// Wire framing negotiated for one streaming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// One undistinguished byte stream, no framing.
    Raw,

    /// Stdout and stderr share the connection via the framing in
    /// [`crate::stream::mux`].
    Multiplexed,
}

impl StreamFormat {
    /// Decide the framing from the request.
    ///
    /// Only upgraded clients at API 1.42 or later understand the
    /// multiplexed content type; everyone else gets the raw stream.
    pub fn negotiate(upgrade: bool, version: ApiVersion) -> StreamFormat {
        if upgrade && version.supports_multiplexed_stream() {
            StreamFormat::Multiplexed
        } else {
            StreamFormat::Raw
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            StreamFormat::Raw => stream_const::MEDIA_TYPE_RAW_STREAM,
            StreamFormat::Multiplexed => stream_const::MEDIA_TYPE_MULTIPLEXED_STREAM,
        }
    }
}

/// Connection lifecycle. Streaming happens between `Announced` and
/// `Closed`; the connection itself does not distinguish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Owned,
    Announced,
    Closed,
}

/// A client connection owned exclusively by one streaming request.
///
/// Constructed immediately after [`ConnectionHijacker::hijack`]
/// succeeds; closed on every exit path.
pub struct HijackedConnection {
    writer: SharedWriter,
    format: StreamFormat,
    success_head: String,
    state: ConnState,
}

impl HijackedConnection {
    /// Take ownership of a raw stream and fix the wire contract.
    ///
    /// Probes the transport with an empty write so buffered HTTP
    /// framing is flushed through before raw data follows; a probe
    /// failure is returned to the caller, which can still render a
    /// conventional error response since no success line was committed.
    ///
    /// Returns the connection plus its read half, which the caller
    /// hands to the client-liveness watcher.
    pub async fn new(
        mut io: Box<dyn RawStream>,
        upgrade: bool,
        version: ApiVersion,
    ) -> DockliteResult<(Self, ConnectionReader)> {
        let _ = io.write(&[]).await?;
        io.flush().await?;

        let format = StreamFormat::negotiate(upgrade, version);
        let success_head = success_head(upgrade, format);
        let (reader, writer) = tokio::io::split(io);

        let conn = Self {
            writer: Arc::new(Mutex::new(writer)),
            format,
            success_head,
            state: ConnState::Owned,
        };
        Ok((conn, reader))
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Whether the success response has been committed to the wire.
    pub fn is_announced(&self) -> bool {
        self.state == ConnState::Announced
    }

    pub(crate) fn shared_writer(&self) -> SharedWriter {
        self.writer.clone()
    }

    /// Writer for one output channel, framing per the negotiated format.
    pub fn channel_writer(&self, channel: StreamChannel) -> ChannelWriter {
        ChannelWriter::new(self.writer.clone(), channel, self.format)
    }

    /// Write the negotiated success response.
    ///
    /// Called exactly once, after all setup that can fail and before the
    /// first byte of container output.
    pub async fn announce(&mut self) -> DockliteResult<()> {
        if self.state != ConnState::Owned {
            return Err(DockliteError::Internal(format!(
                "cannot announce success in connection state {:?}",
                self.state
            )));
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(self.success_head.as_bytes()).await?;
        writer.flush().await?;
        drop(writer);
        self.state = ConnState::Announced;
        Ok(())
    }

    /// Render an error as a raw status line plus body.
    ///
    /// Only valid before the success line: once the client has seen
    /// `announce`, everything on the wire is stream data and no
    /// protocol-correct error framing remains.
    pub async fn write_error(&mut self, err: &DockliteError) -> DockliteResult<()> {
        if self.state != ConnState::Owned {
            return Err(DockliteError::Internal(format!(
                "cannot write an error response in connection state {:?}",
                self.state
            )));
        }
        let (code, reason) = err.http_status();
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n\r\n{}\r\n",
            code,
            reason,
            self.format.content_type(),
            err
        );
        let mut writer = self.writer.lock().await;
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Close the connection. Idempotent; every exit path ends here.
    pub async fn close(&mut self) {
        if self.state == ConnState::Closed {
            return;
        }
        self.state = ConnState::Closed;
        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.shutdown().await {
            tracing::debug!(error = %err, "error shutting down hijacked connection");
        }
    }
}

fn success_head(upgrade: bool, format: StreamFormat) -> String {
    let content_type = format.content_type();
    if upgrade {
        format!(
            "HTTP/1.1 101 UPGRADED\r\nContent-Type: {content_type}\r\nConnection: Upgrade\r\nUpgrade: tcp\r\n\r\n"
        )
    } else {
        format!("HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\n\r\n")
    }
}
