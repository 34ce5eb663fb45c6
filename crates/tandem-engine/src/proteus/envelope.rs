//! Proteus envelope wire format.
//!
//! ```text
//! +------+---------------------------+
//! | type | olm message bytes         |
//! +------+---------------------------+
//!   1 B    variable
//! ```
//!
//! `type` is 0 for a pre-key message (first messages of a session, carrying
//! the sender's identity and the consumed prekey) and 1 for a normal message.

use thiserror::Error;
use vodozemac::olm::{Message, OlmMessage, PreKeyMessage};

/// Envelope type tag of a pre-key message.
pub const PREKEY_MESSAGE: u8 = 0;

/// Envelope type tag of a normal message.
pub const NORMAL_MESSAGE: u8 = 1;

/// Envelope decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// No bytes at all
    #[error("empty envelope")]
    Empty,

    /// Type tag is neither pre-key nor normal
    #[error("unknown envelope type {0}")]
    UnknownType(u8),

    /// Olm message body failed to decode
    #[error("malformed olm message: {0}")]
    Malformed(String),
}

/// Encode an Olm message as an envelope.
pub fn encode(message: &OlmMessage) -> Vec<u8> {
    let (tag, body) = match message {
        OlmMessage::PreKey(message) => (PREKEY_MESSAGE, message.to_bytes()),
        OlmMessage::Normal(message) => (NORMAL_MESSAGE, message.to_bytes()),
    };

    let mut envelope = Vec::with_capacity(1 + body.len());
    envelope.push(tag);
    envelope.extend_from_slice(&body);
    envelope
}

/// Decode an envelope. Never panics on untrusted input.
pub fn decode(bytes: &[u8]) -> Result<OlmMessage, EnvelopeError> {
    let (&tag, body) = bytes.split_first().ok_or(EnvelopeError::Empty)?;

    match tag {
        PREKEY_MESSAGE => PreKeyMessage::try_from(body)
            .map(OlmMessage::PreKey)
            .map_err(|e| EnvelopeError::Malformed(e.to_string())),
        NORMAL_MESSAGE => Message::try_from(body)
            .map(OlmMessage::Normal)
            .map_err(|e| EnvelopeError::Malformed(e.to_string())),
        other => Err(EnvelopeError::UnknownType(other)),
    }
}
