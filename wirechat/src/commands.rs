//! Typed command-line handling.
//!
//! Lines starting with the configured prefix parse into a [`Command`];
//! anything else is submitted as a chat message through the send queue.
//! Execution produces [`Action`]s the same way inbound dispatch does, so
//! commands and packets share one side-effect vocabulary.

use serde_json::Value;

use wirechat_proto::frame::Outbound;
use wirechat_proto::packet::{Packet, RawPacket};

use crate::dispatch::{self, Action};
use crate::queue::Submit;
use crate::render::RenderEvent;
use crate::session::Session;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the available commands.
    Help,
    /// List who is present.
    Users,
    /// Show a stored message with its reply context.
    See {
        /// Message id to look up.
        id: u64,
    },
    /// Send a chat message replying to a stored message.
    Reply {
        /// Message id being replied to.
        id: u64,
        /// Reply body, spacing preserved.
        text: String,
    },
    /// Show or set the display name.
    Name {
        /// New name, or `None` to show the current one.
        value: Option<String>,
    },
    /// Show or set the color.
    Color {
        /// New color (six hex digits), or `None` to show the current one.
        value: Option<String>,
    },
    /// Send an arbitrary packet.
    Packet {
        /// Wire packet type.
        kind: String,
        /// JSON payload text, if given.
        data: Option<String>,
    },
    /// Inject a synthetic inbound packet through the dispatcher.
    Fake {
        /// Wire packet type.
        kind: String,
        /// JSON payload text, if given.
        data: Option<String>,
    },
    /// Toggle a runtime flag.
    Set {
        /// Flag name.
        flag: String,
        /// Bool-like token: `true|yes|1` or `false|no|0`.
        value: String,
    },
    /// An unrecognized command, reported back with its arguments.
    Unknown {
        /// The command word.
        name: String,
        /// Everything after it.
        args: String,
    },
}

/// Errors produced while parsing a command line.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Required arguments were missing.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// An id argument was not a non-negative integer.
    #[error("`{0}` is not a message id")]
    BadId(String),
}

impl Command {
    /// Parse the text after the command prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when a recognized command has missing or
    /// malformed arguments. Unrecognized command words are not an error;
    /// they parse to [`Command::Unknown`] so they can be reported verbatim.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let trimmed = input.trim();
        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim_start()),
            None => (trimmed, ""),
        };

        match name {
            "help" => Ok(Self::Help),
            "users" => Ok(Self::Users),
            "see" => {
                let id = first_word(rest).ok_or(CommandError::Usage("see <id>"))?;
                Ok(Self::See { id: parse_id(id)? })
            }
            "reply" => {
                let (id, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("reply <id> <text>"))?;
                let text = text.trim_start();
                if text.is_empty() {
                    return Err(CommandError::Usage("reply <id> <text>"));
                }
                Ok(Self::Reply {
                    id: parse_id(id)?,
                    text: text.to_string(),
                })
            }
            "name" => Ok(Self::Name {
                value: first_word(rest).map(ToString::to_string),
            }),
            "color" => Ok(Self::Color {
                value: first_word(rest).map(ToString::to_string),
            }),
            "packet" | "fake" => {
                let (kind, data) = match rest.split_once(char::is_whitespace) {
                    Some((kind, json)) => (kind, Some(json.trim_start().to_string())),
                    None if rest.is_empty() => {
                        return Err(if name == "packet" {
                            CommandError::Usage("packet <type> [json]")
                        } else {
                            CommandError::Usage("fake <type> [json]")
                        });
                    }
                    None => (rest, None),
                };
                let kind = kind.to_string();
                if name == "packet" {
                    Ok(Self::Packet { kind, data })
                } else {
                    Ok(Self::Fake { kind, data })
                }
            }
            "set" => {
                let (flag, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("set <flag> <true|yes|1|false|no|0>"))?;
                Ok(Self::Set {
                    flag: flag.to_string(),
                    value: value.trim().to_string(),
                })
            }
            _ => Ok(Self::Unknown {
                name: name.to_string(),
                args: rest.to_string(),
            }),
        }
    }
}

/// Execute a parsed command against the session.
pub fn run(session: &mut Session, command: Command, prefix: &str) -> Vec<Action> {
    match command {
        Command::Help => vec![Action::Render(RenderEvent::Help {
            prefix: prefix.to_string(),
        })],
        Command::Users => vec![Action::Render(RenderEvent::Users(
            session.roster.names().to_vec(),
        ))],
        Command::See { id } => match session.store.get(id) {
            Some(message) => {
                let message = message.clone();
                let reply = session.store.reply_context(&message);
                vec![Action::Render(RenderEvent::Chat { message, reply })]
            }
            None => vec![Action::Render(RenderEvent::Error(format!(
                "no message with id {id}"
            )))],
        },
        Command::Reply { id, text } => submit_chat(session, &text, Some(id)),
        Command::Name { value: None } | Command::Color { value: None } => profile(session),
        Command::Name { value: Some(name) } => {
            // Optimistic: the server's `accepted` confirms, a status report
            // rejects and the identity is overwritten either way.
            session.identity.name = Some(name.clone());
            vec![Action::Send(Outbound::SetUserConf {
                name,
                color: session.identity.color.clone(),
            })]
        }
        Command::Color { value: Some(color) } => {
            if !is_color(&color) {
                return vec![Action::Render(RenderEvent::Error(format!(
                    "`{color}` is not a color (expected 6 hex digits)"
                )))];
            }
            let Some(name) = session.identity.name.clone() else {
                return vec![Action::Render(RenderEvent::Error(
                    "set a display name before changing color".to_string(),
                ))];
            };
            session.identity.color = color.clone();
            vec![Action::Send(Outbound::SetUserConf { name, color })]
        }
        Command::Packet { kind, data } => match parse_payload(data) {
            Ok(data) => vec![Action::Send(Outbound::Raw { kind, data })],
            Err(err) => vec![Action::Render(RenderEvent::Error(format!(
                "bad packet payload: {err}"
            )))],
        },
        Command::Fake { kind, data } => match parse_payload(data) {
            Ok(data) => {
                let raw = RawPacket {
                    kind,
                    data: data.unwrap_or(Value::Null),
                };
                match Packet::from_raw(raw) {
                    Ok(packet) => dispatch::dispatch(session, packet),
                    Err(err) => vec![Action::Render(RenderEvent::Error(format!(
                        "bad fake packet: {err}"
                    )))],
                }
            }
            Err(err) => vec![Action::Render(RenderEvent::Error(format!(
                "bad fake payload: {err}"
            )))],
        },
        Command::Set { flag, value } => match parse_bool_like(&value) {
            Some(value) => {
                if session.flags.set(&flag, value) {
                    Vec::new()
                } else {
                    vec![Action::Render(RenderEvent::Error(format!(
                        "unknown flag `{flag}`"
                    )))]
                }
            }
            None => vec![Action::Render(RenderEvent::Error(format!(
                "`{value}` is not a boolean (use true|yes|1 or false|no|0)"
            )))],
        },
        Command::Unknown { name, args } => vec![Action::Render(RenderEvent::Error(format!(
            "unknown command `{name}`, args: {args}"
        )))],
    }
}

/// Submit a chat line through the send queue.
pub fn submit_chat(session: &mut Session, text: &str, reply: Option<u64>) -> Vec<Action> {
    match session.queue.submit(text) {
        Submit::Send(line) => vec![Action::Send(Outbound::Message { text: line, reply })],
        Submit::Queued => vec![Action::Render(RenderEvent::MessageQueued)],
    }
}

/// Consume an input line as the forced-rename answer.
///
/// The name is not applied locally until the server confirms it, so a
/// rejection status re-enters the rename flow.
pub fn submit_rename(session: &mut Session, line: &str) -> Vec<Action> {
    let name = line.trim();
    if name.is_empty() {
        return vec![Action::Render(RenderEvent::NamePrompt)];
    }
    session.pending_rename = false;
    vec![Action::Send(Outbound::SetUserConf {
        name: name.to_string(),
        color: session.identity.color.clone(),
    })]
}

fn profile(session: &Session) -> Vec<Action> {
    vec![Action::Render(RenderEvent::Profile {
        name: session.identity.name.clone(),
        color: session.identity.color.clone(),
        auth_level: session.identity.auth_level,
    })]
}

fn first_word(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

fn parse_id(token: &str) -> Result<u64, CommandError> {
    token
        .parse()
        .map_err(|_| CommandError::BadId(token.to_string()))
}

fn is_color(value: &str) -> bool {
    value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_payload(data: Option<String>) -> Result<Option<Value>, serde_json::Error> {
    data.map(|text| serde_json::from_str(&text)).transpose()
}

fn parse_bool_like(value: &str) -> Option<bool> {
    match value {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
