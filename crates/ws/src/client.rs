//! Client-side transport: one WebSocket connection driving one
//! [`ClientNode`].

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use objectlink_client::ClientNode;

use crate::conn::{attach_queue, run_connection};
use crate::error::TransportError;

pub struct WsClient {
    url: String,
    node: Arc<ClientNode>,
}

impl WsClient {
    pub fn new(url: impl Into<String>, node: Arc<ClientNode>) -> Self {
        Self {
            url: url.into(),
            node,
        }
    }

    /// Open the WebSocket and wire the node's write fn to it.  The node
    /// can start linking immediately after this returns; anything emitted
    /// before [`WsConnection::run`] is polled sits in the outbound queue.
    pub async fn connect(&self) -> Result<WsConnection, TransportError> {
        tracing::info!(url = %self.url, "connecting");
        let (socket, _response) = connect_async(self.url.as_str()).await?;
        let outbound = attach_queue(&self.node);
        Ok(WsConnection {
            socket,
            node: self.node.clone(),
            outbound,
        })
    }
}

/// An open connection, not yet pumping messages.
pub struct WsConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    node: Arc<ClientNode>,
    outbound: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
}

impl WsConnection {
    /// Pump messages until the peer closes or `shutdown` fires.  On return
    /// the node is detached from its registry.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), TransportError> {
        run_connection(self.socket, self.node, self.outbound, shutdown).await
    }

    /// Same as [`run`](Self::run), as a spawned task.
    pub fn spawn(
        self,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<(), TransportError>> {
        tokio::spawn(self.run(shutdown))
    }
}
