//! Base node plumbing shared by both endpoint kinds.
//!
//! A [`BaseNode`] is a pass-through adapter: outbound messages are encoded
//! and handed to a pluggable write function, inbound payloads are decoded
//! and dispatched to the owning [`ProtocolListener`].  It has no state
//! machine and never suspends; the write function is expected to enqueue,
//! not to perform transport I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{JsonCodec, MessageCodec};
use crate::message::Message;
use crate::protocol::{dispatch, ProtocolListener};

/// Outbound sink for encoded messages.  Must not block.
pub type WriteFn = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Issue a process-unique node id.  Registries use it for "same node"
/// comparisons instead of pointer identity.
pub fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

pub struct BaseNode {
    codec: Arc<dyn MessageCodec>,
    write: Mutex<Option<WriteFn>>,
}

impl BaseNode {
    pub fn new(codec: Arc<dyn MessageCodec>) -> Self {
        Self {
            codec,
            write: Mutex::new(None),
        }
    }

    /// A base node with the default JSON codec.
    pub fn json() -> Self {
        Self::new(Arc::new(JsonCodec))
    }

    pub fn codec(&self) -> Arc<dyn MessageCodec> {
        self.codec.clone()
    }

    /// Install or replace the outbound write function.
    pub fn on_write<F>(&self, write: F)
    where
        F: Fn(Vec<u8>) + Send + Sync + 'static,
    {
        *self.write.lock() = Some(Arc::new(write));
    }

    /// Remove the outbound write function.  Subsequent outbound messages
    /// are logged and dropped, not buffered.
    pub fn clear_write(&self) {
        *self.write.lock() = None;
    }

    /// Encode a message and hand it to the write function, if any.
    pub fn emit_write(&self, msg: Message) {
        // Clone the function out of the lock: a synchronous loopback write
        // may re-enter emit_write on this node.
        let write = self.write.lock().clone();
        let Some(write) = write else {
            tracing::debug!(kind = %msg.kind(), "write not set on node, dropping message");
            return;
        };
        match self.codec.encode(&msg) {
            Ok(raw) => write(raw),
            Err(e) => tracing::error!(kind = %msg.kind(), error = %e, "failed to encode outbound message"),
        }
    }

    /// Decode an inbound payload and dispatch it to the listener.
    ///
    /// Decode failures are logged and dropped; the connection is never torn
    /// down here, that policy belongs to the transport layer.
    pub fn handle_message(&self, raw: &[u8], listener: &dyn ProtocolListener) {
        match self.codec.decode(raw) {
            Ok(msg) => dispatch(listener, msg),
            Err(e) => tracing::warn!(error = %e, "failed to decode inbound message, dropping"),
        }
    }
}
