//! Client configuration.

use std::time::Duration;

use linechat_transport::{ConnectOptions, DEFAULT_MAX_LINE_LENGTH};

/// Configuration for a [`ChatClient`](crate::ChatClient).
///
/// Start from `ClientConfig::default()` and override the fields you care
/// about:
///
/// ```rust
/// use std::time::Duration;
/// use linechat::ClientConfig;
///
/// let config = ClientConfig {
///     connect_timeout: Some(Duration::from_secs(3)),
///     ..ClientConfig::default()
/// };
/// assert!(config.nodelay);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `connect` may spend resolving the host and completing the
    /// TCP handshake. `None` leaves it to the operating system.
    ///
    /// Default: 10 seconds. There is deliberately no read timeout: an idle
    /// server keeps the connection open until someone disconnects.
    pub connect_timeout: Option<Duration>,

    /// Send each line immediately instead of letting the kernel batch
    /// small writes. Default: `true`.
    pub nodelay: bool,

    /// Longest server line accepted, terminator included. A longer line
    /// ends the connection as a read failure. Default: 64 KiB.
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            nodelay: true,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ClientConfig {
    pub(crate) fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout,
            nodelay: self.nodelay,
            max_line_length: self.max_line_length,
        }
    }
}
