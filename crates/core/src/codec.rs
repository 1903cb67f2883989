//! Message encoding.
//!
//! The wire form is a pure function pair over [`Message`], selected at node
//! construction.  JSON is the default; a binary codec (MessagePack, CBOR,
//! BSON) can be substituted by implementing [`MessageCodec`] without
//! touching dispatcher or node logic, as long as the tuple field order is
//! preserved.

use serde_json::Value;

use crate::message::Message;

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload does not decode into a valid message tuple.
    #[error("malformed message: {0}")]
    Malformed(String),
    /// The tuple carries a kind tag no known message uses.
    #[error("unknown message kind tag: {0}")]
    UnknownKind(u64),
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A wire encoding for [`Message`].
pub trait MessageCodec: Send + Sync {
    fn encode(&self, msg: &Message) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, raw: &[u8]) -> Result<Message, CodecError>;

    /// True when encoded frames are valid UTF-8 text.  Transports use this
    /// to pick text or binary framing.
    fn is_text(&self) -> bool {
        true
    }
}

/// The default codec: a JSON array of values.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, msg: &Message) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&msg.clone().into_values())?)
    }

    fn decode(&self, raw: &[u8]) -> Result<Message, CodecError> {
        let values: Vec<Value> =
            serde_json::from_slice(raw).map_err(|e| CodecError::Malformed(e.to_string()))?;
        Message::from_values(values)
    }
}
