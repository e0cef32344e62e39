//! Inbound packet types for the `WireChat` protocol.
//!
//! Inbound frames are JSON text records of the shape `{ "type": …, "data": … }`.
//! Decoding happens in two steps: the raw envelope first, then the typed
//! [`Packet`] for the kinds this client understands. Unknown kinds are not an
//! error; they decode to [`Packet::Unknown`] with their payload intact so the
//! client can report them verbatim.

use serde::Deserialize;
use serde_json::Value;

/// A decoded inbound frame before type-specific interpretation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPacket {
    /// Wire packet type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Packet payload; `null` when the frame carried no `data` key.
    #[serde(default)]
    pub data: Value,
}

/// A chat message as the server delivers it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned id. Sparse and unique per session; never reused.
    pub id: u64,
    /// Display name of the author.
    pub author: String,
    /// Message body.
    #[serde(rename = "message")]
    pub text: String,
    /// Authorization level of the author.
    #[serde(default)]
    pub auth: i64,
    /// Attached donation amount, if any.
    #[serde(default)]
    pub donate_value: Option<f64>,
    /// Id of the message this one replies to, if any.
    #[serde(default)]
    pub reply: Option<u64>,
}

/// Sub-kinds carried by a `status` packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKind {
    /// The client's token was not accepted (yet).
    Unauthenticated,
    /// The client is authenticated; normal operation may begin.
    Authenticated,
    /// The client is banned. Terminal.
    Banned,
    /// The server requires a new display name before continuing.
    Rename,
    /// The requested name is already taken.
    NameExists,
    /// Names may only change every 30 days.
    NameTimeout,
    /// The requested name contains characters outside `A-Za-z0-9_`.
    NameInvalid,
    /// The requested name is outside the 5–32 character bounds.
    NameLength,
    /// The `setuserconf` request was applied.
    SetUserConf,
    /// A status string this client does not know. Non-fatal.
    Other(String),
}

impl StatusKind {
    fn from_wire(status: &str) -> Self {
        match status {
            "unauthenticated" => Self::Unauthenticated,
            "authenticated" => Self::Authenticated,
            "banned" => Self::Banned,
            "rename" => Self::Rename,
            "nameexists" => Self::NameExists,
            "nametimeout" => Self::NameTimeout,
            "nameinvalid" => Self::NameInvalid,
            "namelength" => Self::NameLength,
            "setuserconf" => Self::SetUserConf,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A typed inbound packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Authentication / name-change status report.
    Status(StatusKind),
    /// A free-form notice from the server. Rate-limit cooldowns arrive this
    /// way (see [`crate::cooldown`]), and the server may piggyback a profile
    /// update on the same frame.
    ServerMsg {
        /// Notice text.
        message: String,
        /// Piggybacked display name, if present.
        name: Option<String>,
        /// Piggybacked color, if present.
        color: Option<String>,
    },
    /// The server accepted this client and reports its profile.
    Accepted {
        /// Confirmed display name.
        name: String,
        /// Confirmed color.
        color: String,
    },
    /// Response to a `getuserconf` request.
    UserConf {
        /// Stored display name.
        name: String,
        /// Stored color.
        color: String,
    },
    /// The client's authorization level changed.
    AuthLevel {
        /// New level.
        value: i64,
    },
    /// A user entered the room.
    Join {
        /// Their display name.
        name: String,
    },
    /// A user left the room.
    Part {
        /// Their display name.
        name: String,
    },
    /// A chat message.
    Chat(ChatMessage),
    /// Moderator deletion of previously delivered messages.
    Delete {
        /// Ids of the deleted messages.
        messages: Vec<u64>,
    },
    /// A packet type this client does not understand, payload preserved.
    Unknown {
        /// Wire packet type.
        kind: String,
        /// Raw payload.
        data: Value,
    },
}

impl Packet {
    /// Interpret a raw envelope as a typed packet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::codec::CodecError::Payload`] when a known packet kind
    /// carries a payload that does not match its schema. Unknown kinds never
    /// error.
    pub fn from_raw(raw: RawPacket) -> Result<Self, crate::codec::CodecError> {
        let RawPacket { kind, data } = raw;

        fn payload<T: serde::de::DeserializeOwned>(
            kind: &str,
            data: Value,
        ) -> Result<T, crate::codec::CodecError> {
            serde_json::from_value(data).map_err(|source| crate::codec::CodecError::Payload {
                kind: kind.to_string(),
                source,
            })
        }

        match kind.as_str() {
            "status" => {
                #[derive(Deserialize)]
                struct Data {
                    status: String,
                }
                let d: Data = payload(&kind, data)?;
                Ok(Self::Status(StatusKind::from_wire(&d.status)))
            }
            "servermsg" => {
                #[derive(Deserialize)]
                struct Data {
                    message: String,
                    #[serde(default)]
                    name: Option<String>,
                    #[serde(default)]
                    color: Option<String>,
                }
                let d: Data = payload(&kind, data)?;
                Ok(Self::ServerMsg {
                    message: d.message,
                    name: d.name,
                    color: d.color,
                })
            }
            "accepted" | "getuserconf" => {
                #[derive(Deserialize)]
                struct Data {
                    name: String,
                    color: String,
                }
                let d: Data = payload(&kind, data)?;
                if kind == "accepted" {
                    Ok(Self::Accepted {
                        name: d.name,
                        color: d.color,
                    })
                } else {
                    Ok(Self::UserConf {
                        name: d.name,
                        color: d.color,
                    })
                }
            }
            "authlevel" => {
                #[derive(Deserialize)]
                struct Data {
                    value: i64,
                }
                let d: Data = payload(&kind, data)?;
                Ok(Self::AuthLevel { value: d.value })
            }
            "join" | "part" => {
                #[derive(Deserialize)]
                struct Data {
                    name: String,
                }
                let d: Data = payload(&kind, data)?;
                if kind == "join" {
                    Ok(Self::Join { name: d.name })
                } else {
                    Ok(Self::Part { name: d.name })
                }
            }
            "chat" => Ok(Self::Chat(payload(&kind, data)?)),
            "delete" => {
                #[derive(Deserialize)]
                struct Data {
                    messages: Vec<u64>,
                }
                let d: Data = payload(&kind, data)?;
                Ok(Self::Delete {
                    messages: d.messages,
                })
            }
            _ => Ok(Self::Unknown { kind, data }),
        }
    }
}
