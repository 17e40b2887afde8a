//! # linechat
//!
//! Client for a line-based TCP chat protocol.
//!
//! A [`ChatClient`] connects to a server, sends commands (login, public and
//! private messages, user list and help requests) and delivers everything
//! the server sends back to registered [`ChatObserver`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use linechat::prelude::*;
//!
//! struct Print;
//!
//! impl ChatObserver for Print {
//!     fn on_message_received(&self, message: &TextMessage) {
//!         println!("<{}> {}", message.sender, message.text);
//!     }
//!
//!     fn on_disconnect(&self) {
//!         println!("server went away");
//!     }
//! }
//!
//! # async fn run() {
//! linechat::init_tracing("info");
//!
//! let client = ChatClient::new();
//! let printer = Arc::new(Print);
//! client.register_observer(&printer);
//!
//! if client.connect("localhost", 4000).await {
//!     client.login("alice").await;
//!     client.request_user_list().await;
//! }
//! # }
//! ```
//!
//! ## Crates
//!
//! - `linechat-transport`: TCP connect and line framing
//! - `linechat-protocol`: commands, server events, line parsing
//! - `linechat` (this crate): connection state, dispatch, observers

mod client;
mod config;
mod dispatcher;
mod error;
mod logging;
mod observer;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use dispatcher::{Dispatcher, LoopExit};
pub use error::ClientError;
pub use logging::init_tracing;
pub use observer::{ChatObserver, ObserverRegistry};

/// Protocol types, re-exported for observers.
pub mod protocol {
    pub use linechat_protocol::*;
}

/// Transport layer, re-exported for callers that drive lines directly.
pub mod transport {
    pub use linechat_transport::*;
}

pub mod prelude {
    pub use crate::{ChatClient, ChatObserver, ClientConfig, ClientError};
    pub use linechat_protocol::{ServerEvent, TextMessage};
}
