//! Outbound wire frames for the `WireChat` protocol.
//!
//! Every frame the client sends is a JSON text record carrying the packet
//! type, the authentication scheme and token from static credentials, and
//! an optional payload:
//!
//! ```json
//! { "type": "message", "auth": "google", "token": "…", "data": { "text": "hi" } }
//! ```
//!
//! Credentials ride on every outbound frame; inbound frames never carry them
//! (see [`crate::packet`]).

use serde::Serialize;
use serde_json::{Value, json};

/// Typed client→server packets.
///
/// [`Outbound::Raw`] exists for the `packet` user command, which assembles
/// a frame from a type name and a JSON payload typed at the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Opens a session and asks the server to replay missed messages.
    /// A marker of `-1` means "nothing seen yet, replay everything".
    Hello {
        /// Id of the last message this client saw, or `-1`.
        last_message: i64,
    },
    /// Asks the server to report this client's authentication status.
    Status,
    /// Asks the server for the stored display name and color.
    GetUserConf,
    /// A chat message, optionally replying to a stored message id.
    Message {
        /// The message body. Flushed queue contents arrive newline-joined.
        text: String,
        /// Id of the message being replied to, if any.
        reply: Option<u64>,
    },
    /// Sets the display name and color.
    SetUserConf {
        /// Requested display name.
        name: String,
        /// Six hex digits, no leading marker.
        color: String,
    },
    /// An arbitrary packet assembled from user input.
    Raw {
        /// Wire packet type.
        kind: String,
        /// Payload, if one was supplied.
        data: Option<Value>,
    },
}

impl Outbound {
    /// Wire name of this packet type.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Status => "status",
            Self::GetUserConf => "getuserconf",
            Self::Message { .. } => "message",
            Self::SetUserConf { .. } => "setuserconf",
            Self::Raw { kind, .. } => kind,
        }
    }

    /// Wire payload for this packet.
    ///
    /// `status` carries an empty object while `getuserconf` carries no
    /// `data` key at all; the server distinguishes the two shapes.
    pub(crate) fn data(&self) -> Option<Value> {
        match self {
            Self::Hello { last_message } => Some(json!({ "last_message": last_message })),
            Self::Status => Some(json!({})),
            Self::GetUserConf => None,
            Self::Message { text, reply } => Some(match reply {
                Some(id) => json!({ "text": text, "reply": id }),
                None => json!({ "text": text }),
            }),
            Self::SetUserConf { name, color } => Some(json!({ "name": name, "color": color })),
            Self::Raw { data, .. } => data.clone(),
        }
    }
}

/// A fully addressed outbound frame, ready for encoding.
///
/// Built by [`crate::codec::encode`]; not constructed directly by clients.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    /// Wire packet type.
    #[serde(rename = "type")]
    pub kind: &'a str,
    /// Authentication scheme name from static credentials.
    pub auth: &'a str,
    /// Opaque credential token.
    pub token: &'a str,
    /// Packet payload; the key is omitted when the type carries none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
