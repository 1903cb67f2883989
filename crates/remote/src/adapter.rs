//! A dispatch-table [`ObjectSource`] built from closures.
//!
//! Member lookups go through explicit tables keyed by member path, so an
//! unknown method or property is a typed error rather than a silent miss.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use objectlink_core::{name, Props};

use crate::node::RemoteNode;
use crate::registry::RemoteRegistry;
use crate::source::{ObjectSource, SourceError};

/// Handles one method call.
pub type MethodFn = Box<dyn Fn(Vec<Value>) -> Result<Value, SourceError> + Send + Sync>;

/// Reads one property's current value.
pub type PropertyGetFn = Box<dyn Fn() -> Value + Send + Sync>;

/// Applies one property write.  Returns `Ok(Some(value))` when the write
/// changed the property (the new value is then fanned out), `Ok(None)` when
/// it was a no-op.
pub type PropertySetFn = Box<dyn Fn(Value) -> Result<Option<Value>, SourceError> + Send + Sync>;

pub struct SourceAdapter {
    object_name: String,
    registry: Arc<RemoteRegistry>,
    methods: HashMap<String, MethodFn>,
    getters: HashMap<String, PropertyGetFn>,
    setters: HashMap<String, PropertySetFn>,
}

impl SourceAdapter {
    pub fn builder(object_name: &str) -> SourceAdapterBuilder {
        SourceAdapterBuilder {
            object_name: object_name.to_string(),
            methods: HashMap::new(),
            getters: HashMap::new(),
            setters: HashMap::new(),
        }
    }

    /// Fire a signal on this object, fanned out to every linked node.
    pub fn notify_signal(&self, path: &str, args: Vec<Value>) {
        let signal_name = name::create_name(&self.object_name, path);
        self.registry.notify_signal(&signal_name, args);
    }

    /// Announce a property change made outside the setter table (internal
    /// state transitions, timers, method side effects).
    pub fn notify_property_changed(&self, path: &str, value: Value) {
        let property_name = name::create_name(&self.object_name, path);
        self.registry.notify_property_changed(&property_name, value);
    }
}

impl ObjectSource for SourceAdapter {
    fn object_name(&self) -> String {
        self.object_name.clone()
    }

    fn invoke(&self, full_name: &str, args: Vec<Value>) -> Result<Value, SourceError> {
        let path = name::path_from_name(full_name);
        match self.methods.get(path) {
            Some(method) => method(args),
            None => Err(SourceError::MethodNotFound(full_name.to_string())),
        }
    }

    fn set_property(&self, full_name: &str, value: Value) -> Result<(), SourceError> {
        let path = name::path_from_name(full_name);
        let Some(setter) = self.setters.get(path) else {
            return if self.getters.contains_key(path) {
                Err(SourceError::PropertyReadOnly(full_name.to_string()))
            } else {
                Err(SourceError::PropertyNotFound(full_name.to_string()))
            };
        };
        if let Some(changed) = setter(value)? {
            self.registry.notify_property_changed(full_name, changed);
        }
        Ok(())
    }

    fn linked(&self, name: &str, node: &Arc<RemoteNode>) {
        tracing::debug!(name, node = node.id(), "adapter linked");
    }

    fn collect_properties(&self) -> Props {
        self.getters
            .iter()
            .map(|(path, get)| (path.clone(), get()))
            .collect()
    }
}

pub struct SourceAdapterBuilder {
    object_name: String,
    methods: HashMap<String, MethodFn>,
    getters: HashMap<String, PropertyGetFn>,
    setters: HashMap<String, PropertySetFn>,
}

impl SourceAdapterBuilder {
    pub fn method<F>(mut self, path: &str, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, SourceError> + Send + Sync + 'static,
    {
        self.methods.insert(path.to_string(), Box::new(f));
        self
    }

    pub fn property<G, S>(mut self, path: &str, get: G, set: S) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) -> Result<Option<Value>, SourceError> + Send + Sync + 'static,
    {
        self.getters.insert(path.to_string(), Box::new(get));
        self.setters.insert(path.to_string(), Box::new(set));
        self
    }

    pub fn read_only_property<G>(mut self, path: &str, get: G) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        self.getters.insert(path.to_string(), Box::new(get));
        self
    }

    /// Finish the adapter against the registry it will fan changes out
    /// through.  The adapter still has to be registered with
    /// [`RemoteRegistry::add_source`].
    pub fn build(self, registry: Arc<RemoteRegistry>) -> Arc<SourceAdapter> {
        Arc::new(SourceAdapter {
            object_name: self.object_name,
            registry,
            methods: self.methods,
            getters: self.getters,
            setters: self.setters,
        })
    }
}
