//! Transport layer for linechat.
//!
//! Opens a TCP stream to a chat server and splits it into two
//! newline-framed halves:
//!
//! - [`LineReader`] yields one decoded line per call, `None` at end of stream.
//! - [`LineWriter`] appends the terminator and flushes every line.
//!
//! Both halves are generic over Tokio's `AsyncRead`/`AsyncWrite`, so the
//! layers above can be driven by an in-memory `tokio::io::duplex` pipe in
//! tests and by a real socket in production.
//!
//! The transport knows nothing about verbs or events. It moves lines.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{DEFAULT_MAX_LINE_LENGTH, LineReader, LineWriter, TcpLineConnection, connect};

use std::fmt;
use std::time::Duration;

/// Opaque identifier for a connection.
///
/// Every successful [`connect`] gets a fresh id, which shows up in log
/// fields so the lines of two consecutive sessions can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Socket-level settings applied by [`connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound on name resolution plus the TCP handshake.
    /// `None` waits as long as the operating system does.
    pub connect_timeout: Option<Duration>,

    /// Disable Nagle's algorithm. Chat lines are small and interactive,
    /// so this defaults to `true`.
    pub nodelay: bool,

    /// Longest inbound line accepted, terminator included. A longer line
    /// fails the read with [`TransportError::LineTooLong`].
    ///
    /// Default: [`DEFAULT_MAX_LINE_LENGTH`] (64 KiB).
    pub max_line_length: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            nodelay: true,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
