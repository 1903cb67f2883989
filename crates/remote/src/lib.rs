//! Remote endpoint of the ObjectLink protocol.
//!
//! A remote hosts stateful objects called *sources* and serves any number
//! of linked client connections.  The pieces:
//!
//! - [`ObjectSource`]: the capability an object implements to be hosted
//! - [`SourceAdapter`]: a dispatch-table source built from closures, for
//!   objects that do not want to implement the trait directly
//! - [`RemoteRegistry`]: map from resource name to (source, set of linked
//!   nodes); fan-out of property changes and signals goes through it
//! - [`RemoteNode`]: one protocol endpoint per connection; answers LINK
//!   with INIT and INVOKE with INVOKE_REPLY or ERROR
//!
//! ```text
//!   Source (app) <-> RemoteRegistry <-> RemoteNode (per conn) <-> write fn
//! ```

pub mod adapter;
pub mod mocks;
pub mod node;
pub mod registry;
pub mod source;

pub use adapter::{SourceAdapter, SourceAdapterBuilder};
pub use node::RemoteNode;
pub use registry::RemoteRegistry;
pub use source::{ObjectSource, SourceError};
