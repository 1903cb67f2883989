//! Client-side registry: links sinks to nodes, one node per resource.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use objectlink_core::name;

use crate::node::ClientNode;
use crate::sink::ObjectSink;

struct NodeRef {
    id: u64,
    node: Weak<ClientNode>,
}

#[derive(Default)]
struct SinkEntry {
    sink: Option<Arc<dyn ObjectSink>>,
    node: Option<NodeRef>,
}

/// One-to-one map from resource name to (sink, at most one attached node).
///
/// May be shared across connections or scoped per test; all mutation is
/// safe under concurrent invocation from multiple connection tasks.  Nodes
/// are held weakly so a dropped connection cannot be kept alive by the
/// registry.
#[derive(Default)]
pub struct ClientRegistry {
    entries: Mutex<HashMap<String, SinkEntry>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under its object name.  Returns the node already
    /// attached to that name, if any, so late-joining sinks immediately
    /// learn their transport.
    ///
    /// A second sink for the same resource is rejected: the existing one is
    /// kept and the attempt is logged.
    pub fn add_sink(&self, sink: Arc<dyn ObjectSink>) -> Option<Arc<ClientNode>> {
        let object_name = sink.object_name();
        let resource = name::resource_from_name(&object_name).to_string();
        let mut entries = self.entries.lock();
        let entry = entries.entry(resource.clone()).or_default();
        if entry.sink.is_some() {
            tracing::warn!(resource = %resource, "sink already registered, keeping existing");
        } else {
            tracing::debug!(resource = %resource, "sink registered");
            entry.sink = Some(sink);
        }
        entry.node.as_ref().and_then(|n| n.node.upgrade())
    }

    /// Remove a sink's entry entirely, including any attached node
    /// reference.  Callers must treat this as also detaching.
    pub fn remove_sink(&self, sink: &dyn ObjectSink) {
        let object_name = sink.object_name();
        let resource = name::resource_from_name(&object_name);
        if self.entries.lock().remove(resource).is_none() {
            tracing::debug!(resource, "remove sink failed, resource not registered");
        }
    }

    /// Attach a node to a resource.  At most one node per entry: a second,
    /// different node is rejected and the existing attachment kept.
    pub fn add_node(&self, link_name: &str, node: &Arc<ClientNode>) {
        let resource = name::resource_from_name(link_name).to_string();
        let mut entries = self.entries.lock();
        let entry = entries.entry(resource.clone()).or_default();
        match &entry.node {
            Some(existing) if existing.id != node.id() && existing.node.strong_count() > 0 => {
                tracing::warn!(
                    resource = %resource,
                    existing = existing.id,
                    node = node.id(),
                    "another node already attached, keeping existing"
                );
            }
            _ => {
                entry.node = Some(NodeRef {
                    id: node.id(),
                    node: Arc::downgrade(node),
                });
            }
        }
    }

    /// Detach a node from a resource, but only if it is the attached one;
    /// a stale or foreign detach must not clobber a newer link.
    pub fn remove_node_from_sink(&self, link_name: &str, node: &ClientNode) {
        let resource = name::resource_from_name(link_name);
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(resource) else {
            tracing::debug!(resource, "unlink node failed, resource not registered");
            return;
        };
        match &entry.node {
            Some(attached) if attached.id == node.id() => entry.node = None,
            _ => tracing::debug!(resource, "unlink node failed, not the same node"),
        }
    }

    /// Detach a node from every entry it is attached to (full teardown).
    pub fn remove_node(&self, node: &ClientNode) {
        for entry in self.entries.lock().values_mut() {
            if matches!(&entry.node, Some(attached) if attached.id == node.id()) {
                entry.node = None;
            }
        }
    }

    pub fn get_sink(&self, link_name: &str) -> Option<Arc<dyn ObjectSink>> {
        let resource = name::resource_from_name(link_name);
        let sink = self
            .entries
            .lock()
            .get(resource)
            .and_then(|e| e.sink.clone());
        if sink.is_none() {
            tracing::debug!(resource, "no sink registered");
        }
        sink
    }

    pub fn get_node(&self, link_name: &str) -> Option<Arc<ClientNode>> {
        let resource = name::resource_from_name(link_name);
        let node = self
            .entries
            .lock()
            .get(resource)
            .and_then(|e| e.node.as_ref())
            .and_then(|n| n.node.upgrade());
        if node.is_none() {
            tracing::debug!(resource, "no node attached");
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSink;

    fn setup() -> (Arc<ClientRegistry>, Arc<MockSink>, Arc<ClientNode>) {
        let registry = Arc::new(ClientRegistry::new());
        let sink = MockSink::new("demo.Counter");
        registry.add_sink(sink.clone());
        let node = ClientNode::new(registry.clone());
        registry.add_node("demo.Counter", &node);
        (registry, sink, node)
    }

    #[test]
    fn add_and_get_sink_and_node() {
        let (registry, sink, node) = setup();
        assert!(Arc::ptr_eq(
            &registry.get_node("demo.Counter").unwrap(),
            &node
        ));
        // member names resolve to the same entry
        assert_eq!(
            registry.get_sink("demo.Counter/count").unwrap().object_name(),
            sink.object_name()
        );
    }

    #[test]
    fn remove_sink_drops_entire_entry() {
        let (registry, sink, _node) = setup();
        registry.remove_sink(sink.as_ref());
        assert!(registry.get_sink("demo.Counter").is_none());
        assert!(registry.get_node("demo.Counter").is_none());
    }

    #[test]
    fn duplicate_sink_keeps_existing() {
        let (registry, sink, _node) = setup();
        let other = MockSink::new("demo.Counter");
        registry.add_sink(other.clone());

        // the kept registration is still the first sink
        registry.get_sink("demo.Counter").unwrap().on_release();
        assert_eq!(sink.events().len(), 1);
        assert!(other.events().is_empty());
    }

    #[test]
    fn add_sink_returns_attached_node() {
        let registry = Arc::new(ClientRegistry::new());
        let node = ClientNode::new(registry.clone());
        registry.add_node("demo.Counter", &node);

        let attached = registry.add_sink(MockSink::new("demo.Counter"));
        assert!(Arc::ptr_eq(&attached.unwrap(), &node));
    }

    #[test]
    fn second_node_does_not_overwrite() {
        let (registry, _sink, node) = setup();
        let other = ClientNode::new(registry.clone());
        registry.add_node("demo.Counter", &other);
        assert!(Arc::ptr_eq(
            &registry.get_node("demo.Counter").unwrap(),
            &node
        ));
    }

    #[test]
    fn foreign_detach_is_a_no_op() {
        let (registry, _sink, node) = setup();
        let other = ClientNode::new(registry.clone());
        registry.remove_node_from_sink("demo.Counter", &other);
        assert!(Arc::ptr_eq(
            &registry.get_node("demo.Counter").unwrap(),
            &node
        ));

        registry.remove_node_from_sink("demo.Counter", &node);
        assert!(registry.get_node("demo.Counter").is_none());
    }

    #[test]
    fn remove_node_clears_every_entry() {
        let (registry, _sink, node) = setup();
        registry.add_sink(MockSink::new("demo.Calc"));
        registry.add_node("demo.Calc", &node);

        registry.remove_node(&node);
        assert!(registry.get_node("demo.Counter").is_none());
        assert!(registry.get_node("demo.Calc").is_none());
    }

    #[test]
    fn lookups_do_not_create_entries() {
        let registry = ClientRegistry::new();
        assert!(registry.get_sink("demo.Ghost").is_none());
        assert!(registry.get_node("demo.Ghost").is_none());
        assert!(registry.entries.lock().is_empty());
    }
}
