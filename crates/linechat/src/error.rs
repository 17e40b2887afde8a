//! Unified error type for the linechat client.

use std::net::SocketAddr;

use linechat_protocol::ProtocolError;
use linechat_transport::TransportError;

/// Top-level error that wraps the transport and protocol errors.
///
/// The client's public operations never return this directly. They report
/// `false` and keep the error's text for
/// [`ChatClient::last_error`](crate::ChatClient::last_error).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (resolve, connect, send, receive, close).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (rejected command, malformed line).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A send was attempted with no open connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a connection is open.
    #[error("already connected to {0}")]
    AlreadyConnected(SocketAddr),
}
