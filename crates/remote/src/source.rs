//! The source capability hosted by [`RemoteNode`](crate::node::RemoteNode).

use std::sync::Arc;

use objectlink_core::Props;
use serde_json::Value;

use crate::node::RemoteNode;

/// Failure of a source operation.  Invoke failures are reported back to the
/// calling client as ERROR messages; property write failures are logged.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no such method: {0}")]
    MethodNotFound(String),
    #[error("no such property: {0}")]
    PropertyNotFound(String),
    #[error("property is read-only: {0}")]
    PropertyReadOnly(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("{0}")]
    Failed(String),
}

/// A hosted object.  Implementations own their state and decide whether a
/// property write actually changes anything; only real changes should be
/// propagated through the registry.
pub trait ObjectSource: Send + Sync {
    /// The object name this source is registered under.
    fn object_name(&self) -> String;

    /// A method call addressed by member name.
    fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value, SourceError>;

    /// A property write addressed by member name.
    fn set_property(&self, name: &str, value: Value) -> Result<(), SourceError>;

    /// A node linked to this source.  `node` is the connection endpoint; a
    /// source wanting to address a single peer can keep a `Weak` to it.
    fn linked(&self, name: &str, node: &Arc<RemoteNode>);

    /// The full property snapshot, sent in the INIT answering a LINK.
    fn collect_properties(&self) -> Props;
}
