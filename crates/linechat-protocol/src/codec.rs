//! Turning inbound lines into [`ServerEvent`]s.
//!
//! Every server line has the shape `<verb>[ <rest>]`. The verb picks the
//! event; the rest is interpreted per verb. Parsing is pure and has no I/O,
//! so the dispatcher and the tests share exactly the same rules.

use crate::types::response;
use crate::{ProtocolError, ServerEvent, TextMessage};

/// Splits a line on its first space into `(verb, rest)`.
///
/// Without a space the whole line is the verb and `rest` is empty.
/// Only the first space is consumed, so `rest` keeps any further spacing.
pub fn split_verb(line: &str) -> (&str, &str) {
    line.split_once(' ').unwrap_or((line, ""))
}

/// Parses one server line.
///
/// Returns:
/// - `Ok(Some(event))` for a recognised verb
/// - `Ok(None)` for an empty line or an unknown verb; unknown verbs are
///   skipped so newer servers can add responses without breaking us
/// - `Err(ProtocolError::MalformedLine)` when `msg`/`privmsg` has no
///   `<sender> <text>` structure
///
/// ```rust
/// use linechat_protocol::{ServerEvent, parse_line};
///
/// let event = parse_line("loginerr name taken").unwrap();
/// assert_eq!(
///     event,
///     Some(ServerEvent::LoginResult {
///         success: false,
///         reason: Some("name taken".into()),
///     })
/// );
/// ```
pub fn parse_line(line: &str) -> Result<Option<ServerEvent>, ProtocolError> {
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = split_verb(line);
    let event = match verb {
        response::LOGIN_OK => ServerEvent::LoginResult {
            success: true,
            reason: None,
        },
        response::LOGIN_ERR => ServerEvent::LoginResult {
            success: false,
            reason: Some(rest.to_string()),
        },
        response::USERS => ServerEvent::UserList {
            users: split_words(rest),
        },
        response::MSG => {
            ServerEvent::MessageReceived(parse_message(verb, line, rest, false)?)
        }
        response::PRIVMSG => {
            ServerEvent::MessageReceived(parse_message(verb, line, rest, true)?)
        }
        response::MSG_ERR => ServerEvent::MessageError {
            message: rest.to_string(),
        },
        response::CMD_ERR => ServerEvent::CommandError {
            message: rest.to_string(),
        },
        response::SUPPORTED => ServerEvent::SupportedCommands {
            commands: split_words(rest),
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

/// `<sender> <text>`: the sender is the first word, the text is everything
/// after the first space, possibly empty.
fn parse_message(
    verb: &str,
    line: &str,
    rest: &str,
    private: bool,
) -> Result<TextMessage, ProtocolError> {
    match rest.split_once(' ') {
        Some((sender, text)) if !sender.is_empty() => Ok(TextMessage {
            sender: sender.to_string(),
            private,
            text: text.to_string(),
        }),
        _ => Err(ProtocolError::MalformedLine {
            verb: verb.to_string(),
            line: line.to_string(),
        }),
    }
}

/// Space-separated list. Runs of spaces do not produce empty names.
fn split_words(rest: &str) -> Vec<String> {
    rest.split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}
