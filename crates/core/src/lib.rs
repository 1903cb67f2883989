//! Wire protocol core shared by both endpoint kinds.
//!
//! ObjectLink exposes stateful objects (properties, methods, signals) over
//! any ordered, message-framed byte transport.  This crate holds everything
//! both sides agree on:
//!
//! - [`name`]: `"resource/path"` addressing of objects and their members
//! - [`Message`] / [`MsgKind`]: the nine-message wire taxonomy
//! - [`MessageCodec`] / [`JsonCodec`]: pluggable encoding of the ordered
//!   wire tuple (JSON array by default)
//! - [`ProtocolListener`] / [`dispatch`]: mapping a decoded message to one
//!   endpoint callback
//! - [`BaseNode`]: the pass-through adapter between a concrete node and its
//!   outbound write function
//!
//! Client endpoints live in `objectlink-client`, server endpoints in
//! `objectlink-remote`, and the WebSocket adapter in `objectlink-ws`.

pub mod codec;
pub mod message;
pub mod name;
pub mod node;
pub mod protocol;

pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use message::{Message, MsgKind, Props};
pub use node::{next_node_id, BaseNode, WriteFn};
pub use protocol::{dispatch, ProtocolListener};
