//! Wire protocol for linechat.
//!
//! This crate defines the language the client and a chat server speak:
//!
//! - **Types** ([`Command`], [`ServerEvent`], [`TextMessage`]): what goes
//!   out and what comes back.
//! - **Codec** ([`parse_line`], [`split_verb`]): how an inbound line becomes
//!   an event.
//! - **Errors** ([`ProtocolError`]): rejected commands and malformed lines.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (lines) and the client
//! (connection state and observers). It has no I/O of its own.
//!
//! ```text
//! Transport (lines) → Protocol (ServerEvent) → Client (observers)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{parse_line, split_verb};
pub use error::ProtocolError;
pub use types::{Command, ServerEvent, TextMessage, request, response};
