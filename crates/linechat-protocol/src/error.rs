//! Error types for the protocol layer.
//!
//! Each crate in linechat defines its own error enum. A `ProtocolError`
//! always means a line was rejected on its way in or out, never that the
//! network misbehaved.

/// Errors that can occur while building commands or parsing server lines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A required part of an outbound command was empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// An outbound command part contained `\n` or `\r`, which would split
    /// it into two lines on the wire.
    #[error("{0} must not contain a line break")]
    LineTerminator(&'static str),

    /// A part that the server reads as one word contained whitespace.
    #[error("{0} must be a single word")]
    NotSingleWord(&'static str),

    /// A server line had a known verb but lacked the structure that verb
    /// requires, e.g. `msg alice` with no message text.
    #[error("malformed `{verb}` line: {line:?}")]
    MalformedLine { verb: String, line: String },
}
