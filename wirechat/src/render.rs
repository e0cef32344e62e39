//! Terminal output rendering.
//!
//! The dispatcher and command handlers emit structured [`RenderEvent`]s;
//! formatting them into terminal lines happens here, at the edge. Notice
//! texts are presentation only; the single exception where text matters to
//! the protocol is rate-limit parsing, which lives in
//! [`wirechat_proto::cooldown`].

use chrono::Local;
use serde_json::Value;

use wirechat_proto::packet::ChatMessage;

use crate::store::ReplyContext;

/// Status reports surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusNotice {
    /// The token was not accepted (yet).
    Unauthenticated,
    /// Authentication succeeded.
    Authenticated,
    /// The client is banned; the process is about to exit.
    Banned,
    /// First login: the server requires a display name.
    ForcedRename,
    /// The requested name is taken.
    NameExists,
    /// Names change at most every 30 days.
    NameTimeout,
    /// The requested name has characters outside `A-Za-z0-9_`.
    NameInvalid,
    /// The requested name is outside the 5–32 character bounds.
    NameLength,
    /// The profile update was applied.
    Applied,
    /// An unrecognized status string. Non-fatal.
    Unknown(String),
}

/// Connection lifecycle notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkNotice {
    /// The transport closed; a reconnect is scheduled.
    Lost {
        /// Seconds until the next attempt.
        retry_secs: u64,
    },
    /// No inbound traffic within the watchdog window; reconnecting now.
    Stalled,
    /// Opening the transport failed; a retry is scheduled.
    ConnectFailed {
        /// Seconds until the next attempt.
        retry_secs: u64,
    },
}

/// A structured unit of output for the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// A chat message with its resolved reply context.
    Chat {
        /// The message.
        message: ChatMessage,
        /// What its `reply` field points at.
        reply: ReplyContext,
    },
    /// Free-form server notice.
    ServerMessage(String),
    /// A user entered the room.
    Joined(String),
    /// A user left the room.
    Parted(String),
    /// A moderator deleted a message.
    MessageDeleted(u64),
    /// Authentication / name-change status.
    Status(StatusNotice),
    /// An outbound line was queued behind an active cooldown.
    MessageQueued,
    /// The previously attempted send was moved into the queue.
    RequeuedLast,
    /// The forced-rename flow wants a name typed at the terminal.
    NamePrompt,
    /// Roster listing.
    Users(Vec<String>),
    /// The local profile.
    Profile {
        /// Display name, if confirmed.
        name: Option<String>,
        /// Color, six hex digits.
        color: String,
        /// Authorization level.
        auth_level: i64,
    },
    /// Command reference.
    Help {
        /// The configured command prefix.
        prefix: String,
    },
    /// Raw packet dump (the `dump` flag).
    PacketDump(String),
    /// A packet type this client does not understand.
    Unsupported {
        /// Wire packet type.
        kind: String,
        /// Raw payload.
        data: Value,
    },
    /// A local failure: bad command arguments, malformed frame, etc.
    Error(String),
    /// Connection lifecycle notice.
    Link(LinkNotice),
}

/// Format an event as terminal text. May span multiple lines.
#[must_use]
pub fn format_event(event: &RenderEvent) -> String {
    match event {
        RenderEvent::Chat { message, reply } => format_chat(message, reply),
        RenderEvent::ServerMessage(text) => format!("Server message: {text}"),
        RenderEvent::Joined(name) => format!("{name} has joined."),
        RenderEvent::Parted(name) => format!("{name} has left."),
        RenderEvent::MessageDeleted(id) => format!("! Message {id} deleted by a moderator."),
        RenderEvent::Status(notice) => format_status(notice),
        RenderEvent::MessageQueued => "! Message queued.".to_string(),
        RenderEvent::RequeuedLast => "! Queuing previous message.".to_string(),
        RenderEvent::NamePrompt => "! Type a new display name:".to_string(),
        RenderEvent::Users(names) => {
            if names.is_empty() {
                "! Nobody is present.".to_string()
            } else {
                format!("! {} present: {}", plural(names.len()), names.join(", "))
            }
        }
        RenderEvent::Profile {
            name,
            color,
            auth_level,
        } => format!(
            "! You are {} (color {color}, auth level {auth_level})",
            name.as_deref().unwrap_or("unnamed")
        ),
        RenderEvent::Help { prefix } => format_help(prefix),
        RenderEvent::PacketDump(raw) => format!("Packet: {raw}"),
        RenderEvent::Unsupported { kind, data } => {
            format!("! Received unsupported packet type {kind}, data: {data}")
        }
        RenderEvent::Error(reason) => format!("! {reason}"),
        RenderEvent::Link(notice) => format_link(notice),
    }
}

/// Prefix an event's text with the local wall-clock time.
///
/// Continuation lines are indented to align under the first.
#[must_use]
pub fn stamp(text: &str) -> String {
    let clock = Local::now().format("%H:%M");
    let mut out = String::new();
    for (index, line) in text.lines().enumerate() {
        if index == 0 {
            out.push_str(&format!("{clock} {line}"));
        } else {
            out.push_str(&format!("\n      {line}"));
        }
    }
    out
}

fn format_chat(message: &ChatMessage, reply: &ReplyContext) -> String {
    let mut out = String::new();
    match reply {
        ReplyContext::NotAReply => {}
        ReplyContext::Deleted(id) => {
            out.push_str(&format!("re #{id}: (message deleted)\n"));
        }
        ReplyContext::Found { id, author, text } => {
            out.push_str(&format!("re #{id} <{author}>: {text}\n"));
        }
    }
    match message.donate_value {
        Some(amount) => out.push_str(&format!(
            "<{}> [donated {amount:.2}] {}",
            message.author, message.text
        )),
        None => out.push_str(&format!("<{}> {}", message.author, message.text)),
    }
    out
}

fn format_status(notice: &StatusNotice) -> String {
    match notice {
        StatusNotice::Unauthenticated => "! You're not authenticated.".to_string(),
        StatusNotice::Authenticated => "! You're authenticated now.".to_string(),
        StatusNotice::Banned => "! You've been banned.".to_string(),
        StatusNotice::ForcedRename => {
            "! The server requires you to pick a display name.".to_string()
        }
        StatusNotice::NameExists => "! That name is already taken.".to_string(),
        StatusNotice::NameTimeout => {
            "! You cannot change your name this quickly, the timeout is 30 days per name change."
                .to_string()
        }
        StatusNotice::NameInvalid => "! Name does not match A-Za-z0-9_.".to_string(),
        StatusNotice::NameLength => {
            "! Display name must be between 5 and 32 characters long.".to_string()
        }
        StatusNotice::Applied => "! User data successfully set.".to_string(),
        StatusNotice::Unknown(status) => format!("! Unknown status {status}."),
    }
}

fn format_link(notice: &LinkNotice) -> String {
    match notice {
        LinkNotice::Lost { retry_secs } => {
            format!("Disconnected, retrying in {retry_secs} seconds...")
        }
        LinkNotice::Stalled => "Connection stalled, reconnecting...".to_string(),
        LinkNotice::ConnectFailed { retry_secs } => {
            format!("Could not connect, retrying in {retry_secs} seconds...")
        }
    }
}

fn format_help(prefix: &str) -> String {
    [
        "Commands:".to_string(),
        format!("  {prefix}help                 this list"),
        format!("  {prefix}users                who is present"),
        format!("  {prefix}see <id>             show a stored message"),
        format!("  {prefix}reply <id> <text>    reply to a message"),
        format!("  {prefix}name [value]         show or set your display name"),
        format!("  {prefix}color [value]        show or set your color (6 hex digits)"),
        format!("  {prefix}packet <type> [json] send an arbitrary packet"),
        format!("  {prefix}fake <type> [json]   inject a synthetic inbound packet"),
        format!("  {prefix}set <flag> <bool>    toggle a runtime flag"),
        "Anything else is sent as a chat message.".to_string(),
    ]
    .join("\n")
}

fn plural(count: usize) -> String {
    if count == 1 {
        "1 user".to_string()
    } else {
        format!("{count} users")
    }
}
