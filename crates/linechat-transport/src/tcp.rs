//! TCP implementation: resolve, connect, split into line halves.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
    BufReader,
};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::{ConnectOptions, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Default cap on one inbound line, terminator included.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// An open TCP connection, not yet split into halves.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    max_line_length: usize,
}

impl TcpLineConnection {
    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the address of the server we connected to.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Splits the stream into an owned line reader and line writer.
    ///
    /// The halves can live on different tasks. The socket is closed once
    /// both halves have been dropped.
    pub fn into_split(
        self,
    ) -> (LineReader<OwnedReadHalf>, LineWriter<OwnedWriteHalf>) {
        let (read, write) = self.stream.into_split();
        (
            LineReader::with_max_line_length(read, self.max_line_length),
            LineWriter::new(write),
        )
    }
}

/// Resolves `host` and opens a TCP stream to the first address that
/// accepts.
///
/// # Errors
/// - [`TransportError::Resolve`] / [`TransportError::NoAddress`] when the
///   name does not resolve
/// - [`TransportError::ConnectFailed`] when every address refuses
/// - [`TransportError::ConnectTimeout`] when `options.connect_timeout`
///   elapses first
pub async fn connect(
    host: &str,
    port: u16,
    options: &ConnectOptions,
) -> Result<TcpLineConnection, TransportError> {
    let attempt = open_stream(host, port);
    let (stream, peer) = match options.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| TransportError::ConnectTimeout(host.to_string()))??,
        None => attempt.await?,
    };

    if let Err(e) = stream.set_nodelay(options.nodelay) {
        tracing::debug!(error = %e, "could not set TCP_NODELAY");
    }

    let id =
        ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(%id, %peer, "TCP connection established");

    Ok(TcpLineConnection {
        id,
        peer,
        stream,
        max_line_length: options.max_line_length,
    })
}

async fn open_stream(
    host: &str,
    port: u16,
) -> Result<(TcpStream, SocketAddr), TransportError> {
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(
        |source| TransportError::Resolve {
            host: host.to_string(),
            source,
        },
    )?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok((stream, addr)),
            Err(source) => {
                tracing::debug!(%addr, error = %source, "connect attempt failed");
                last_error = Some(TransportError::ConnectFailed { addr, source });
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| TransportError::NoAddress(host.to_string())))
}

// ---------------------------------------------------------------------------
// LineReader
// ---------------------------------------------------------------------------

/// Reads newline-terminated lines.
///
/// Bytes are decoded as UTF-8 with invalid sequences replaced, so a
/// misbehaving server cannot turn a single bad byte into a read failure.
/// The trailing `\n` (and a `\r` before it) is stripped. Lines longer
/// than the configured maximum fail instead of growing the buffer.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_line_length: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_line_length(inner, DEFAULT_MAX_LINE_LENGTH)
    }

    /// `max_line_length` counts the terminator. It is raised to at least 1.
    pub fn with_max_line_length(inner: R, max_line_length: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
            max_line_length: max_line_length.max(1),
        }
    }

    /// Waits for the next line.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly. A final
    /// unterminated fragment before the close is returned as a line.
    ///
    /// # Errors
    /// - [`TransportError::ReceiveFailed`] if the socket read fails
    /// - [`TransportError::LineTooLong`] if no terminator arrives within
    ///   the maximum line length
    pub async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        let mut limited = (&mut self.inner).take(self.max_line_length as u64);
        let read = limited
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if read == 0 {
            return Ok(None);
        }
        if read == self.max_line_length && self.buf.last() != Some(&b'\n') {
            return Err(TransportError::LineTooLong(self.max_line_length));
        }

        let text = String::from_utf8_lossy(&self.buf);
        Ok(Some(text.trim_end_matches(LINE_ENDINGS).to_string()))
    }
}

// ---------------------------------------------------------------------------
// LineWriter
// ---------------------------------------------------------------------------

/// Writes one line at a time, flushing after each.
pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes `line` followed by `\n` and flushes.
    ///
    /// The caller is responsible for `line` not containing a terminator.
    pub async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.inner
            .write_all(&bytes)
            .await
            .map_err(TransportError::SendFailed)?;
        self.inner.flush().await.map_err(TransportError::SendFailed)
    }

    /// Shuts down the write direction. The peer sees end of stream.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.inner
            .shutdown()
            .await
            .map_err(TransportError::CloseFailed)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn test_read_line_strips_crlf() {
        let (mut server, client) = tokio::io::duplex(256);
        let mut reader = LineReader::new(client);

        server.write_all(b"loginok\r\nusers a b\n").await.unwrap();
        drop(server);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("loginok"));
        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("users a b")
        );
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_line_returns_trailing_fragment_before_eof() {
        let (mut server, client) = tokio::io::duplex(256);
        let mut reader = LineReader::new(client);

        server.write_all(b"cmderr no newline").await.unwrap();
        drop(server);

        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("cmderr no newline")
        );
        assert!(reader.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_line_replaces_invalid_utf8() {
        let (mut server, client) = tokio::io::duplex(256);
        let mut reader = LineReader::new(client);

        server.write_all(b"msg bob caf\xff\n").await.unwrap();
        drop(server);

        let line = reader.read_line().await.unwrap().unwrap();
        assert_eq!(line, "msg bob caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_read_line_keeps_empty_lines() {
        // Empty lines are the dispatcher's business, not the transport's.
        let (mut server, client) = tokio::io::duplex(256);
        let mut reader = LineReader::new(client);

        server.write_all(b"\nloginok\n").await.unwrap();
        drop(server);

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("loginok"));
    }

    #[tokio::test]
    async fn test_read_line_rejects_overlong_line() {
        let (mut server, client) = tokio::io::duplex(256);
        let mut reader = LineReader::with_max_line_length(client, 8);

        server.write_all(b"users a\nusers alice bob carol\n").await.unwrap();

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("users a"));
        assert!(matches!(
            reader.read_line().await,
            Err(TransportError::LineTooLong(8))
        ));
    }

    #[tokio::test]
    async fn test_write_line_appends_terminator() {
        let (client, server) = tokio::io::duplex(256);
        let mut writer = LineWriter::new(client);
        let mut reader = LineReader::new(server);

        writer.write_line("privmsg bob hi").await.unwrap();
        writer.write_line("users").await.unwrap();

        assert_eq!(
            reader.read_line().await.unwrap().as_deref(),
            Some("privmsg bob hi")
        );
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("users"));
    }

    #[tokio::test]
    async fn test_shutdown_signals_end_of_stream() {
        let (client, server) = tokio::io::duplex(256);
        let mut writer = LineWriter::new(client);
        let mut reader = LineReader::new(server);

        writer.shutdown().await.unwrap();

        assert!(reader.read_line().await.unwrap().is_none());
    }
}
