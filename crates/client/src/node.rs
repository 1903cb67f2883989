//! Client endpoint: one node per connection.
//!
//! Routes inbound INIT/PROPERTY_CHANGE/SIGNAL messages to the sink bound in
//! the registry and correlates INVOKE_REPLY messages to pending callbacks
//! by request id.  All operations are synchronous and non-blocking; the
//! installed write function is expected to enqueue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use objectlink_core::{
    next_node_id, BaseNode, JsonCodec, Message, MessageCodec, MsgKind, Props, ProtocolListener,
};

use crate::registry::ClientRegistry;
use crate::sink::{InvokeReply, InvokeReplyFn, ObjectSink};

/// Failure of an awaited invoke.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The pending entry was dropped before a reply arrived, either because
    /// the node was torn down or the remote answered with an ERROR message.
    #[error("invoke dropped before a reply arrived")]
    Dropped,
}

pub struct ClientNode {
    id: u64,
    base: BaseNode,
    registry: Arc<ClientRegistry>,
    pending: Mutex<HashMap<u64, InvokeReplyFn>>,
    request_id: AtomicU64,
    me: Weak<ClientNode>,
}

impl ClientNode {
    /// A client node with the default JSON codec.
    pub fn new(registry: Arc<ClientRegistry>) -> Arc<Self> {
        Self::with_codec(registry, Arc::new(JsonCodec))
    }

    pub fn with_codec(registry: Arc<ClientRegistry>, codec: Arc<dyn MessageCodec>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: next_node_id(),
            base: BaseNode::new(codec),
            registry,
            pending: Mutex::new(HashMap::new()),
            request_id: AtomicU64::new(0),
            me: me.clone(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn codec(&self) -> Arc<dyn MessageCodec> {
        self.base.codec()
    }

    /// Install or replace the outbound write function.
    pub fn on_write<F>(&self, write: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        self.base.on_write(write);
    }

    pub fn clear_write(&self) {
        self.base.clear_write();
    }

    /// Feed one inbound transport payload into the node.
    pub fn handle_message(&self, raw: &[u8]) {
        self.base.handle_message(raw, self);
    }

    /// Register a sink with the registry.  Returns the node already
    /// attached to the sink's name, if any.
    pub fn register_sink(&self, sink: Arc<dyn ObjectSink>) -> Option<Arc<ClientNode>> {
        self.registry.add_sink(sink)
    }

    pub fn unregister_sink(&self, sink: &dyn ObjectSink) {
        self.registry.remove_sink(sink);
    }

    /// Attach this node to a name in the registry without sending wire
    /// traffic (used when the remote side initiates).
    pub fn link_node(&self, name: &str) {
        if let Some(me) = self.me.upgrade() {
            self.registry.add_node(name, &me);
        }
    }

    /// Detach this node from a name without sending wire traffic.
    pub fn unlink_node(&self, name: &str) {
        self.registry.remove_node_from_sink(name, self);
    }

    /// Attach this node to a name, then send a LINK message.  Attachment
    /// happens first so a synchronous loopback INIT has somewhere to route.
    pub fn link_remote(&self, name: &str) {
        tracing::debug!(name, node = self.id, "link remote");
        self.link_node(name);
        self.base.emit_write(Message::link(name));
    }

    /// Send an UNLINK message, then detach, so the remote is told while
    /// this node is still considered linked.
    pub fn unlink_remote(&self, name: &str) {
        tracing::debug!(name, node = self.id, "unlink remote");
        self.base.emit_write(Message::unlink(name));
        self.unlink_node(name);
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Call a method on the remote object.  With a reply callback the call
    /// is correlated by a fresh request id; without one it is
    /// fire-and-forget and no bookkeeping occurs.
    pub fn invoke_remote(&self, name: &str, args: Vec<Value>, reply: Option<InvokeReplyFn>) {
        let request_id = self.next_request_id();
        tracing::debug!(name, request_id, node = self.id, "invoke remote");
        if let Some(reply) = reply {
            self.pending.lock().insert(request_id, reply);
        }
        self.base.emit_write(Message::invoke(request_id, name, args));
    }

    /// Call a method and await its reply.  Built atop the pending map;
    /// timeout and cancellation stay with the caller.
    pub async fn invoke_remote_async(
        &self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<InvokeReply, InvokeError> {
        let (tx, rx) = oneshot::channel();
        self.invoke_remote(
            name,
            args,
            Some(Box::new(move |reply| {
                let _ = tx.send(reply);
            })),
        );
        rx.await.map_err(|_| InvokeError::Dropped)
    }

    /// Request a property write.  No PROPERTY_CHANGE echo is expected; the
    /// remote side decides whether to propagate a change.
    pub fn set_remote_property(&self, name: &str, value: Value) {
        tracing::debug!(name, node = self.id, "set remote property");
        self.base.emit_write(Message::set_property(name, value));
    }

    /// Detach this node from every registry entry it was attached to,
    /// without notifying the remote.
    pub fn detach(&self) {
        tracing::debug!(node = self.id, "detach client node");
        self.registry.remove_node(self);
    }
}

impl ProtocolListener for ClientNode {
    fn handle_init(&self, name: &str, props: Props) {
        tracing::debug!(name, node = self.id, "handle init");
        let Some(sink) = self.registry.get_sink(name) else {
            return;
        };
        if let Some(me) = self.me.upgrade() {
            sink.on_init(name, props, me);
        }
    }

    fn handle_property_change(&self, name: &str, value: Value) {
        if let Some(sink) = self.registry.get_sink(name) {
            sink.on_property_changed(name, value);
        }
    }

    fn handle_signal(&self, name: &str, args: Vec<Value>) {
        if let Some(sink) = self.registry.get_sink(name) {
            sink.on_signal(name, args);
        }
    }

    fn handle_invoke_reply(&self, request_id: u64, name: &str, value: Value) {
        // removed before delivery: exactly-once even if a duplicate arrives
        let reply = self.pending.lock().remove(&request_id);
        match reply {
            Some(deliver) => deliver(InvokeReply {
                name: name.to_string(),
                value,
            }),
            None => tracing::debug!(request_id, name, "no pending invoke, dropping reply"),
        }
    }

    fn handle_error(&self, kind: MsgKind, request_id: u64, message: &str) {
        tracing::warn!(kind = %kind, request_id, message, node = self.id, "error from remote");
        if kind == MsgKind::Invoke && self.pending.lock().remove(&request_id).is_some() {
            // dropping the callback wakes any awaiting caller with an error
            tracing::debug!(request_id, "pending invoke failed by remote error");
        }
    }
}
