//! Core protocol types: what the client sends and what the server tells it.
//!
//! Outbound traffic is a [`Command`]: a verb plus free-form arguments,
//! rendered as one line. Inbound traffic becomes a [`ServerEvent`] once the
//! codec has parsed it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// Verbs the client sends.
pub mod request {
    pub const LOGIN: &str = "login";
    pub const MSG: &str = "msg";
    pub const PRIVMSG: &str = "privmsg";
    pub const USERS: &str = "users";
    pub const HELP: &str = "help";
}

/// Verbs the server sends. Matching is exact and case-sensitive.
pub mod response {
    pub const LOGIN_OK: &str = "loginok";
    pub const LOGIN_ERR: &str = "loginerr";
    pub const USERS: &str = "users";
    pub const MSG: &str = "msg";
    pub const PRIVMSG: &str = "privmsg";
    pub const MSG_ERR: &str = "msgerr";
    pub const CMD_ERR: &str = "cmderr";
    pub const SUPPORTED: &str = "supported";
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One outbound protocol line.
///
/// A `Command` can only be built through its constructors, which reject
/// anything that would break the line framing. Holding a `Command` means
/// it is safe to put on the wire.
///
/// `Display` renders the wire form without the terminator:
///
/// ```rust
/// use linechat_protocol::Command;
///
/// let cmd = Command::private_message("bob", "see you at 5").unwrap();
/// assert_eq!(cmd.to_string(), "privmsg bob see you at 5");
/// assert_eq!(Command::users().to_string(), "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: String,
}

impl Command {
    /// Builds a command from a raw verb and argument text.
    ///
    /// # Errors
    /// - [`ProtocolError::EmptyField`] if `verb` is empty
    /// - [`ProtocolError::NotSingleWord`] if `verb` contains whitespace
    /// - [`ProtocolError::LineTerminator`] if either part contains a line
    ///   break
    pub fn new(
        verb: impl Into<String>,
        args: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let verb = verb.into();
        let args = args.into();
        require_single_line("verb", &verb)?;
        require_single_line("arguments", &args)?;
        require_single_word("verb", &verb)?;
        Ok(Self { verb, args })
    }

    /// `login <username>`.
    pub fn login(username: &str) -> Result<Self, ProtocolError> {
        require_present("username", username)?;
        Self::new(request::LOGIN, username)
    }

    /// `msg <text>`, a message to everyone.
    pub fn public_message(text: &str) -> Result<Self, ProtocolError> {
        require_present("message text", text)?;
        require_single_line("message text", text)?;
        Self::new(request::MSG, text)
    }

    /// `privmsg <recipient> <text>`.
    pub fn private_message(
        recipient: &str,
        text: &str,
    ) -> Result<Self, ProtocolError> {
        require_present("recipient", recipient)?;
        require_present("message text", text)?;
        require_single_line("recipient", recipient)?;
        require_single_line("message text", text)?;
        require_single_word("recipient", recipient)?;
        Self::new(request::PRIVMSG, format!("{recipient} {text}"))
    }

    /// `users`, asking for the list of logged-in users.
    pub fn users() -> Self {
        Self {
            verb: request::USERS.to_string(),
            args: String::new(),
        }
    }

    /// `help`, asking which commands the server supports.
    pub fn help() -> Self {
        Self {
            verb: request::HELP.to_string(),
            args: String::new(),
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.verb)
        } else {
            write!(f, "{} {}", self.verb, self.args)
        }
    }
}

fn require_present(
    field: &'static str,
    value: &str,
) -> Result<(), ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyField(field));
    }
    Ok(())
}

fn require_single_line(
    field: &'static str,
    value: &str,
) -> Result<(), ProtocolError> {
    if value.contains(['\n', '\r']) {
        return Err(ProtocolError::LineTerminator(field));
    }
    Ok(())
}

fn require_single_word(
    field: &'static str,
    value: &str,
) -> Result<(), ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyField(field));
    }
    if value.contains(char::is_whitespace) {
        return Err(ProtocolError::NotSingleWord(field));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server events
// ---------------------------------------------------------------------------

/// A chat message received from another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    /// Username of the sender.
    pub sender: String,
    /// `true` for `privmsg`, `false` for a public `msg`.
    pub private: bool,
    /// Message body. Internal spaces are preserved exactly.
    pub text: String,
}

/// Something the server told us, already parsed.
///
/// One event is produced per meaningful inbound line, plus a synthesized
/// [`ServerEvent::Disconnected`] when the connection ends underneath the
/// read loop.
///
/// `#[serde(tag = "type")]` gives the internally tagged shape
/// `{ "type": "UserList", "users": [...] }`, which UI layers forwarding
/// events as JSON can switch on directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Answer to `login`. `reason` is set only on failure.
    LoginResult {
        success: bool,
        reason: Option<String>,
    },

    /// The connection was closed by the server or failed.
    Disconnected,

    /// Users currently logged in.
    UserList { users: Vec<String> },

    /// A public or private message from another user.
    MessageReceived(TextMessage),

    /// The server could not deliver a message we sent.
    MessageError { message: String },

    /// The server did not understand a command we sent.
    CommandError { message: String },

    /// Commands the server supports, in answer to `help`.
    SupportedCommands { commands: Vec<String> },
}

impl ServerEvent {
    /// Short name of the variant, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoginResult { .. } => "login_result",
            Self::Disconnected => "disconnected",
            Self::UserList { .. } => "user_list",
            Self::MessageReceived(_) => "message_received",
            Self::MessageError { .. } => "message_error",
            Self::CommandError { .. } => "command_error",
            Self::SupportedCommands { .. } => "supported_commands",
        }
    }
}
