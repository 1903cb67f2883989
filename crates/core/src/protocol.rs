//! Protocol dispatcher.
//!
//! Maps a decoded [`Message`] to one of nine semantic callbacks on a
//! [`ProtocolListener`].  Both node kinds implement the listener; each side
//! only overrides the messages it understands; the defaults log at debug
//! and drop, since a client receiving a LINK is a routing miss, not a fault.

use serde_json::Value;

use crate::message::{Message, MsgKind, Props};

/// The nine semantic operations of the protocol.
///
/// All callbacks are synchronous and non-blocking; transport suspension
/// happens outside the listener.
pub trait ProtocolListener {
    fn handle_link(&self, name: &str) {
        tracing::debug!(name, "unhandled link message, dropping");
    }

    fn handle_init(&self, name: &str, _props: Props) {
        tracing::debug!(name, "unhandled init message, dropping");
    }

    fn handle_unlink(&self, name: &str) {
        tracing::debug!(name, "unhandled unlink message, dropping");
    }

    fn handle_set_property(&self, name: &str, _value: Value) {
        tracing::debug!(name, "unhandled set_property message, dropping");
    }

    fn handle_property_change(&self, name: &str, _value: Value) {
        tracing::debug!(name, "unhandled property_change message, dropping");
    }

    fn handle_invoke(&self, request_id: u64, name: &str, _args: Vec<Value>) {
        tracing::debug!(request_id, name, "unhandled invoke message, dropping");
    }

    fn handle_invoke_reply(&self, request_id: u64, name: &str, _value: Value) {
        tracing::debug!(request_id, name, "unhandled invoke_reply message, dropping");
    }

    fn handle_signal(&self, name: &str, _args: Vec<Value>) {
        tracing::debug!(name, "unhandled signal message, dropping");
    }

    fn handle_error(&self, kind: MsgKind, request_id: u64, message: &str) {
        tracing::debug!(kind = %kind, request_id, message, "unhandled error message, dropping");
    }
}

/// Route a decoded message to the listener callback for its kind.
pub fn dispatch(listener: &dyn ProtocolListener, msg: Message) {
    match msg {
        Message::Link { name } => listener.handle_link(&name),
        Message::Init { name, props } => listener.handle_init(&name, props),
        Message::Unlink { name } => listener.handle_unlink(&name),
        Message::SetProperty { name, value } => listener.handle_set_property(&name, value),
        Message::PropertyChange { name, value } => listener.handle_property_change(&name, value),
        Message::Invoke {
            request_id,
            name,
            args,
        } => listener.handle_invoke(request_id, &name, args),
        Message::InvokeReply {
            request_id,
            name,
            value,
        } => listener.handle_invoke_reply(request_id, &name, value),
        Message::Signal { name, args } => listener.handle_signal(&name, args),
        Message::Error {
            kind,
            request_id,
            message,
        } => listener.handle_error(kind, request_id, &message),
    }
}
