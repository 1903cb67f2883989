//! Client endpoint of the ObjectLink protocol.
//!
//! A client observes and drives remote objects through local proxy objects
//! called *sinks*.  The pieces:
//!
//! - [`ObjectSink`]: the capability application code implements to receive
//!   init snapshots, property changes, and signals
//! - [`ClientRegistry`]: one-to-one map from resource name to (sink, at
//!   most one attached node)
//! - [`ClientNode`]: one protocol endpoint per connection; issues
//!   LINK/UNLINK/SET_PROPERTY/INVOKE and correlates INVOKE_REPLY messages
//!   to pending callbacks by request id
//!
//! ```text
//!   Sink (app) <-> ClientRegistry <-> ClientNode <-> write fn (transport)
//! ```

pub mod mocks;
pub mod node;
pub mod registry;
pub mod sink;

pub use node::{ClientNode, InvokeError};
pub use registry::ClientRegistry;
pub use sink::{InvokeReply, InvokeReplyFn, ObjectSink};
