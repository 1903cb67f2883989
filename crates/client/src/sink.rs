//! The sink capability consumed by [`ClientNode`](crate::node::ClientNode).

use std::sync::Arc;

use objectlink_core::Props;
use serde_json::Value;

use crate::node::ClientNode;

/// Reply to a correlated INVOKE, delivered to the callback registered with
/// [`ClientNode::invoke_remote`](crate::node::ClientNode::invoke_remote).
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeReply {
    pub name: String,
    pub value: Value,
}

/// Callback invoked exactly once when the matching INVOKE_REPLY arrives.
pub type InvokeReplyFn = Box<dyn FnOnce(InvokeReply) + Send>;

/// A local proxy for a remote object.  Implemented by application code and
/// registered with the [`ClientRegistry`](crate::registry::ClientRegistry).
pub trait ObjectSink: Send + Sync {
    /// The object name this sink is registered under.
    fn object_name(&self) -> String;

    /// A signal fired on the remote object.
    fn on_signal(&self, name: &str, args: Vec<Value>);

    /// A property on the remote object changed.
    fn on_property_changed(&self, name: &str, value: Value);

    /// The link handshake completed.  `props` is the full property snapshot
    /// at link time; `node` is the endpoint the sink can use for invokes
    /// and property writes.
    fn on_init(&self, name: &str, props: Props, node: Arc<ClientNode>);

    /// The sink was released from the registry.
    fn on_release(&self);
}
