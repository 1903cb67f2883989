//! WebSocket transport for ObjectLink nodes.
//!
//! Each connection runs one node.  Outbound writes go through an unbounded
//! channel drained by a dedicated writer task, so the synchronous node
//! write fn never blocks; the reader loop feeds inbound frames straight
//! into the node.
//!
//! - [`WsClient`] connects a [`ClientNode`](objectlink_client::ClientNode)
//!   to a remote endpoint
//! - [`WsServer`] accepts connections and runs a fresh
//!   [`RemoteNode`](objectlink_remote::RemoteNode) per connection against
//!   a shared [`RemoteRegistry`](objectlink_remote::RemoteRegistry)

mod conn;
mod error;

pub mod client;
pub mod server;

pub use client::{WsClient, WsConnection};
pub use error::TransportError;
pub use server::WsServer;
