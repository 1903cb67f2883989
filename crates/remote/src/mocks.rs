//! Recording source for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use objectlink_core::{name, Props};

use crate::node::RemoteNode;
use crate::registry::RemoteRegistry;
use crate::source::{ObjectSource, SourceError};

/// Everything a [`MockSource`] observed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Linked { name: String },
    Invoke { name: String, args: Vec<Value> },
    PropertySet { name: String, value: Value },
}

/// An [`ObjectSource`] that records every call.  Invokes echo the full
/// member name back as their result; property writes are change-detected
/// against a local map and fanned out through the registry.
pub struct MockSource {
    object_name: String,
    registry: Arc<RemoteRegistry>,
    events: Mutex<Vec<SourceEvent>>,
    properties: Mutex<Props>,
}

impl MockSource {
    pub fn new(registry: Arc<RemoteRegistry>, object_name: &str) -> Arc<Self> {
        Self::with_properties(registry, object_name, Props::new())
    }

    pub fn with_properties(
        registry: Arc<RemoteRegistry>,
        object_name: &str,
        properties: Props,
    ) -> Arc<Self> {
        Arc::new(Self {
            object_name: object_name.to_string(),
            registry,
            events: Mutex::new(Vec::new()),
            properties: Mutex::new(properties),
        })
    }

    pub fn events(&self) -> Vec<SourceEvent> {
        self.events.lock().clone()
    }

    pub fn properties(&self) -> Props {
        self.properties.lock().clone()
    }

    /// Fire a signal on this object, fanned out to every linked node.
    pub fn notify_signal(&self, path: &str, args: Vec<Value>) {
        let signal_name = name::create_name(&self.object_name, path);
        self.registry.notify_signal(&signal_name, args);
    }
}

impl ObjectSource for MockSource {
    fn object_name(&self) -> String {
        self.object_name.clone()
    }

    fn invoke(&self, full_name: &str, args: Vec<Value>) -> Result<Value, SourceError> {
        self.events.lock().push(SourceEvent::Invoke {
            name: full_name.to_string(),
            args,
        });
        Ok(Value::String(full_name.to_string()))
    }

    fn set_property(&self, full_name: &str, value: Value) -> Result<(), SourceError> {
        self.events.lock().push(SourceEvent::PropertySet {
            name: full_name.to_string(),
            value: value.clone(),
        });
        let path = name::path_from_name(full_name).to_string();
        {
            let mut properties = self.properties.lock();
            if properties.get(&path) == Some(&value) {
                return Ok(());
            }
            properties.insert(path, value.clone());
        }
        self.registry.notify_property_changed(full_name, value);
        Ok(())
    }

    fn linked(&self, name: &str, _node: &Arc<RemoteNode>) {
        self.events.lock().push(SourceEvent::Linked {
            name: name.to_string(),
        });
    }

    fn collect_properties(&self) -> Props {
        self.properties.lock().clone()
    }
}
