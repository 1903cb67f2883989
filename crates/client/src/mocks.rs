//! Recording sink for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use objectlink_core::{name, Props};

use crate::node::ClientNode;
use crate::sink::ObjectSink;

/// Everything a [`MockSink`] observed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Init { name: String, props: Props },
    PropertyChanged { name: String, value: Value },
    Signal { name: String, args: Vec<Value> },
    InvokeReply { name: String, value: Value },
    Released,
}

/// An [`ObjectSink`] that records every callback and mirrors property
/// changes into a local map, keyed by member path.
pub struct MockSink {
    object_name: String,
    events: Mutex<Vec<SinkEvent>>,
    properties: Mutex<Props>,
    node: Mutex<Option<Arc<ClientNode>>>,
}

impl MockSink {
    pub fn new(object_name: &str) -> Arc<Self> {
        Arc::new(Self {
            object_name: object_name.to_string(),
            events: Mutex::new(Vec::new()),
            properties: Mutex::new(Props::new()),
            node: Mutex::new(None),
        })
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Property snapshot as last seen (init merged with later changes).
    pub fn properties(&self) -> Props {
        self.properties.lock().clone()
    }

    /// The node handed over by `on_init`, if linked.
    pub fn node(&self) -> Option<Arc<ClientNode>> {
        self.node.lock().clone()
    }

    /// Invoke a method through the linked node, recording the reply as a
    /// [`SinkEvent::InvokeReply`].
    pub fn invoke(self: &Arc<Self>, method: &str, args: Vec<Value>) {
        let Some(node) = self.node() else {
            return;
        };
        let full_name = name::create_name(&self.object_name, method);
        let me = Arc::clone(self);
        node.invoke_remote(
            &full_name,
            args,
            Some(Box::new(move |reply| {
                me.events.lock().push(SinkEvent::InvokeReply {
                    name: reply.name,
                    value: reply.value,
                });
            })),
        );
    }
}

impl ObjectSink for MockSink {
    fn object_name(&self) -> String {
        self.object_name.clone()
    }

    fn on_signal(&self, name: &str, args: Vec<Value>) {
        self.events.lock().push(SinkEvent::Signal {
            name: name.to_string(),
            args,
        });
    }

    fn on_property_changed(&self, name: &str, value: Value) {
        let path = name::path_from_name(name).to_string();
        self.properties.lock().insert(path, value.clone());
        self.events.lock().push(SinkEvent::PropertyChanged {
            name: name.to_string(),
            value,
        });
    }

    fn on_init(&self, name: &str, props: Props, node: Arc<ClientNode>) {
        *self.properties.lock() = props.clone();
        *self.node.lock() = Some(node);
        self.events.lock().push(SinkEvent::Init {
            name: name.to_string(),
            props,
        });
    }

    fn on_release(&self) {
        self.events.lock().push(SinkEvent::Released);
    }
}
