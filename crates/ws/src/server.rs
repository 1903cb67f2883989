//! Server-side transport: accepts WebSocket connections and runs one
//! [`RemoteNode`] per connection against a shared registry.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use objectlink_remote::{RemoteNode, RemoteRegistry};

use crate::conn::{attach_queue, run_connection};
use crate::error::TransportError;

pub struct WsServer {
    registry: Arc<RemoteRegistry>,
}

impl WsServer {
    pub fn new(registry: Arc<RemoteRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RemoteRegistry> {
        &self.registry
    }

    /// Accept connections until `shutdown` fires.  Every accepted socket
    /// gets its own node and task; cancelling the token tears down the
    /// accept loop and every connection spawned from it.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            tracing::info!(%peer, "client connected");

            let registry = self.registry.clone();
            let conn_shutdown = shutdown.child_token();
            tokio::spawn(async move {
                let socket = match tokio_tungstenite::accept_async(stream).await {
                    Ok(socket) => socket,
                    Err(err) => {
                        tracing::warn!(%peer, error = %err, "websocket handshake failed");
                        return;
                    }
                };

                let node = RemoteNode::new(registry);
                let outbound = attach_queue(&node);
                if let Err(err) = run_connection(socket, node, outbound, conn_shutdown).await {
                    tracing::warn!(%peer, error = %err, "connection failed");
                }
                tracing::info!(%peer, "client disconnected");
            });
        }
        Ok(())
    }
}
