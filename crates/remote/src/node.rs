//! Remote endpoint: one node per connection.
//!
//! Answers LINK with an INIT snapshot, routes SET_PROPERTY and INVOKE to
//! the registered source, and reports invoke failures back as ERROR
//! messages.  Fan-out to other connections goes through the registry.

use std::sync::{Arc, Weak};

use serde_json::Value;

use objectlink_core::{
    next_node_id, BaseNode, JsonCodec, Message, MessageCodec, MsgKind, ProtocolListener,
};

use crate::registry::RemoteRegistry;
use crate::source::ObjectSource;

pub struct RemoteNode {
    id: u64,
    base: BaseNode,
    registry: Arc<RemoteRegistry>,
    me: Weak<RemoteNode>,
}

impl RemoteNode {
    /// A remote node with the default JSON codec.
    pub fn new(registry: Arc<RemoteRegistry>) -> Arc<Self> {
        Self::with_codec(registry, Arc::new(JsonCodec))
    }

    pub fn with_codec(registry: Arc<RemoteRegistry>, codec: Arc<dyn MessageCodec>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id: next_node_id(),
            base: BaseNode::new(codec),
            registry,
            me: me.clone(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn registry(&self) -> &Arc<RemoteRegistry> {
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

    /// Register a source with the registry.  Registration is shared by
    /// every connection, not scoped to this node.
    pub fn register_source(&self, source: Arc<dyn ObjectSource>) {
        self.registry.add_source(source);
    }

    pub fn unregister_source(&self, source: &dyn ObjectSource) {
        self.registry.remove_source(source);
    }

    /// Send a PROPERTY_CHANGE over this connection.
    pub fn notify_property_changed(&self, name: &str, value: Value) {
        self.base.emit_write(Message::property_change(name, value));
    }

    /// Send a SIGNAL over this connection.
    pub fn notify_signal(&self, name: &str, args: Vec<Value>) {
        self.base.emit_write(Message::signal(name, args));
    }

    /// Unlink this node from every source (connection teardown).
    pub fn detach(&self) {
        tracing::debug!(node = self.id, "detach remote node");
        self.registry.remove_node(self);
    }
}

impl ProtocolListener for RemoteNode {
    fn handle_link(&self, name: &str) {
        let Some(source) = self.registry.get_source(name) else {
            return;
        };
        tracing::debug!(name, node = self.id, "link");
        let Some(me) = self.me.upgrade() else {
            return;
        };
        self.registry.add_node_to_source(name, &me);
        source.linked(name, &me);
        let props = source.collect_properties();
        self.base.emit_write(Message::init(name, props));
    }

    fn handle_unlink(&self, name: &str) {
        tracing::debug!(name, node = self.id, "unlink");
        self.registry.remove_node_from_source(name, self);
    }

    fn handle_set_property(&self, name: &str, value: Value) {
        let Some(source) = self.registry.get_source(name) else {
            return;
        };
        // no request id to correlate, so a failed write is only logged;
        // the source propagates an actual change through the registry
        if let Err(err) = source.set_property(name, value) {
            tracing::error!(name, %err, "property write rejected");
        }
    }

    fn handle_invoke(&self, request_id: u64, name: &str, args: Vec<Value>) {
        let Some(source) = self.registry.get_source(name) else {
            return;
        };
        tracing::debug!(name, request_id, node = self.id, "invoke");
        match source.invoke(name, args) {
            Ok(value) => {
                self.base
                    .emit_write(Message::invoke_reply(request_id, name, value));
            }
            Err(err) => {
                tracing::warn!(name, request_id, %err, "invoke failed");
                self.base
                    .emit_write(Message::error(MsgKind::Invoke, request_id, err.to_string()));
            }
        }
    }
}
