use std::net::SocketAddr;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("unknown host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no usable address.
    #[error("no address found for host {0}")]
    NoAddress(String),

    /// Every resolved address refused or failed the connection.
    /// Holds the error from the last address tried.
    #[error("could not connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Resolution plus connect did not finish within the configured limit.
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    /// Writing a line failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a line failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The server sent more than the allowed number of bytes without a
    /// line terminator.
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Shutting down the write half failed.
    #[error("close failed: {0}")]
    CloseFailed(#[source] std::io::Error),
}
