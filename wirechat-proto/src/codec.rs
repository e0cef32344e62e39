//! Encoding and decoding for the `WireChat` wire protocol.
//!
//! Frames travel as WebSocket text messages containing one JSON record each;
//! the transport preserves message boundaries so no framing layer is needed.

use crate::frame::{Envelope, Outbound};
use crate::packet::{Packet, RawPacket};

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame was not a JSON record of the expected envelope shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A known packet kind carried a payload that does not match its schema.
    #[error("bad `{kind}` payload: {source}")]
    Payload {
        /// The packet kind whose payload failed to decode.
        kind: String,
        /// The underlying deserialization failure.
        source: serde_json::Error,
    },
}

/// Encode an outbound packet as a JSON text frame, attaching credentials.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if serialization fails.
pub fn encode(packet: &Outbound, auth: &str, token: &str) -> Result<String, CodecError> {
    let envelope = Envelope {
        kind: packet.kind(),
        auth,
        token,
        data: packet.data(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode an inbound text frame into a typed [`Packet`].
///
/// Unknown packet kinds are preserved as [`Packet::Unknown`] rather than
/// rejected; only structurally malformed JSON or a bad payload for a known
/// kind is an error.
///
/// # Errors
///
/// Returns [`CodecError`] when the text is not a valid frame.
pub fn decode(text: &str) -> Result<Packet, CodecError> {
    let raw: RawPacket = serde_json::from_str(text)?;
    Packet::from_raw(raw)
}
