//! Remote-side registry: one source per resource, any number of linked
//! nodes.  Property changes and signals fan out to every live node.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use objectlink_core::name;

use crate::node::RemoteNode;
use crate::source::ObjectSource;

#[derive(Default)]
struct SourceEntry {
    source: Option<Arc<dyn ObjectSource>>,
    nodes: HashMap<u64, Weak<RemoteNode>>,
}

/// Shared across all connections of one remote endpoint.  Nodes are held
/// weakly and keyed by node id so a dropped connection cannot be kept alive
/// here; dead entries are pruned on fan-out.
#[derive(Default)]
pub struct RemoteRegistry {
    entries: Mutex<HashMap<String, SourceEntry>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its object name.  A second source for the
    /// same resource is rejected: the existing one is kept and the attempt
    /// is logged.
    pub fn add_source(&self, source: Arc<dyn ObjectSource>) {
        let object_name = source.object_name();
        let resource = name::resource_from_name(&object_name).to_string();
        let mut entries = self.entries.lock();
        let entry = entries.entry(resource.clone()).or_default();
        if entry.source.is_some() {
            tracing::warn!(resource = %resource, "source already registered, keeping existing");
        } else {
            tracing::debug!(resource = %resource, "source registered");
            entry.source = Some(source);
        }
    }

    /// Remove a source's entry entirely, dropping its linked-node set.
    pub fn remove_source(&self, source: &dyn ObjectSource) {
        let object_name = source.object_name();
        let resource = name::resource_from_name(&object_name);
        if self.entries.lock().remove(resource).is_none() {
            tracing::debug!(resource, "remove source failed, resource not registered");
        }
    }

    pub fn get_source(&self, link_name: &str) -> Option<Arc<dyn ObjectSource>> {
        let resource = name::resource_from_name(link_name);
        let source = self
            .entries
            .lock()
            .get(resource)
            .and_then(|e| e.source.clone());
        if source.is_none() {
            tracing::debug!(resource, "no source registered");
        }
        source
    }

    /// Every node currently linked to the resource.  Dead weak references
    /// are pruned as a side effect.
    pub fn get_nodes(&self, link_name: &str) -> Vec<Arc<RemoteNode>> {
        let resource = name::resource_from_name(link_name);
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(resource) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(entry.nodes.len());
        entry.nodes.retain(|_, weak| match weak.upgrade() {
            Some(node) => {
                live.push(node);
                true
            }
            None => false,
        });
        live
    }

    /// Link a node to a resource.  Idempotent: re-linking the same node
    /// replaces its entry.
    pub fn add_node_to_source(&self, link_name: &str, node: &Arc<RemoteNode>) {
        let resource = name::resource_from_name(link_name).to_string();
        let mut entries = self.entries.lock();
        let entry = entries.entry(resource).or_default();
        entry.nodes.insert(node.id(), Arc::downgrade(node));
    }

    /// Unlink a node from a resource.
    pub fn remove_node_from_source(&self, link_name: &str, node: &RemoteNode) {
        let resource = name::resource_from_name(link_name);
        let mut entries = self.entries.lock();
        match entries.get_mut(resource) {
            Some(entry) => {
                entry.nodes.remove(&node.id());
            }
            None => tracing::debug!(resource, "unlink failed, resource not registered"),
        }
    }

    /// Unlink a node from every resource (connection teardown).
    pub fn remove_node(&self, node: &RemoteNode) {
        for entry in self.entries.lock().values_mut() {
            entry.nodes.remove(&node.id());
        }
    }

    /// Send a PROPERTY_CHANGE to every node linked to the property's
    /// resource.  Nodes are collected under the lock and written to after
    /// it is released, since a write may loop straight back into a node.
    pub fn notify_property_changed(&self, property_name: &str, value: Value) {
        for node in self.get_nodes(property_name) {
            node.notify_property_changed(property_name, value.clone());
        }
    }

    /// Send a SIGNAL to every node linked to the signal's resource.
    pub fn notify_signal(&self, signal_name: &str, args: Vec<Value>) {
        for node in self.get_nodes(signal_name) {
            node.notify_signal(signal_name, args.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSource;

    fn setup() -> (Arc<RemoteRegistry>, Arc<MockSource>, Arc<RemoteNode>) {
        let registry = Arc::new(RemoteRegistry::new());
        let source = MockSource::new(registry.clone(), "demo.Counter");
        registry.add_source(source.clone());
        let node = RemoteNode::new(registry.clone());
        registry.add_node_to_source("demo.Counter", &node);
        (registry, source, node)
    }

    #[test]
    fn add_and_get_source_and_nodes() {
        let (registry, source, node) = setup();
        assert_eq!(
            registry.get_source("demo.Counter/count").unwrap().object_name(),
            source.object_name()
        );
        let nodes = registry.get_nodes("demo.Counter");
        assert_eq!(nodes.len(), 1);
        assert!(Arc::ptr_eq(&nodes[0], &node));
    }

    #[test]
    fn duplicate_source_keeps_existing() {
        let (registry, source, _node) = setup();
        let other = MockSource::new(registry.clone(), "demo.Counter");
        registry.add_source(other.clone());

        let kept = registry.get_source("demo.Counter").unwrap();
        kept.invoke("demo.Counter/ping", vec![]).unwrap();
        assert_eq!(source.events().len(), 1);
        assert!(other.events().is_empty());
    }

    #[test]
    fn relinking_the_same_node_is_idempotent() {
        let (registry, _source, node) = setup();
        registry.add_node_to_source("demo.Counter", &node);
        assert_eq!(registry.get_nodes("demo.Counter").len(), 1);
    }

    #[test]
    fn remove_node_from_source_unlinks_only_that_node() {
        let (registry, _source, node) = setup();
        let other = RemoteNode::new(registry.clone());
        registry.add_node_to_source("demo.Counter", &other);

        registry.remove_node_from_source("demo.Counter", &node);
        let nodes = registry.get_nodes("demo.Counter");
        assert_eq!(nodes.len(), 1);
        assert!(Arc::ptr_eq(&nodes[0], &other));
    }

    #[test]
    fn remove_node_clears_every_resource() {
        let (registry, _source, node) = setup();
        registry.add_source(MockSource::new(registry.clone(), "demo.Calc"));
        registry.add_node_to_source("demo.Calc", &node);

        registry.remove_node(&node);
        assert!(registry.get_nodes("demo.Counter").is_empty());
        assert!(registry.get_nodes("demo.Calc").is_empty());
    }

    #[test]
    fn dead_nodes_are_pruned_on_fanout() {
        let (registry, _source, node) = setup();
        drop(node);
        assert!(registry.get_nodes("demo.Counter").is_empty());
    }

    #[test]
    fn remove_source_drops_the_linked_set() {
        let (registry, source, _node) = setup();
        registry.remove_source(source.as_ref());
        assert!(registry.get_source("demo.Counter").is_none());
        assert!(registry.get_nodes("demo.Counter").is_empty());
    }
}
