//! Shared connection plumbing for both endpoints.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use objectlink_client::ClientNode;
use objectlink_remote::RemoteNode;

use crate::error::TransportError;

/// What the transport needs from a node, regardless of which side it is.
pub(crate) trait ConnectionNode: Send + Sync + 'static {
    fn install_write(&self, tx: mpsc::UnboundedSender<Vec<u8>>);
    fn clear_write(&self);
    fn handle_raw(&self, raw: &[u8]);
    fn text_frames(&self) -> bool;
    fn detach(&self);
}

impl ConnectionNode for std::sync::Arc<ClientNode> {
    fn install_write(&self, tx: mpsc::UnboundedSender<Vec<u8>>) {
        self.on_write(move |raw| {
            if tx.send(raw).is_err() {
                tracing::debug!("outbound channel closed, dropping write");
            }
        });
    }

    fn clear_write(&self) {
        ClientNode::clear_write(self);
    }

    fn handle_raw(&self, raw: &[u8]) {
        self.handle_message(raw);
    }

    fn text_frames(&self) -> bool {
        self.codec().is_text()
    }

    fn detach(&self) {
        ClientNode::detach(self);
    }
}

impl ConnectionNode for std::sync::Arc<RemoteNode> {
    fn install_write(&self, tx: mpsc::UnboundedSender<Vec<u8>>) {
        self.on_write(move |raw| {
            if tx.send(raw).is_err() {
                tracing::debug!("outbound channel closed, dropping write");
            }
        });
    }

    fn clear_write(&self) {
        RemoteNode::clear_write(self);
    }

    fn handle_raw(&self, raw: &[u8]) {
        self.handle_message(raw);
    }

    fn text_frames(&self) -> bool {
        self.codec().is_text()
    }

    fn detach(&self) {
        RemoteNode::detach(self);
    }
}

/// Install the outbound queue on a node and hand back its drain end.
/// Installed before the connection task starts, so messages emitted between
/// setup and the first poll are queued rather than dropped.
pub(crate) fn attach_queue<N: ConnectionNode>(node: &N) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    node.install_write(tx);
    rx
}

/// Run one connection to completion: a writer task drains the outbound
/// queue while the reader loop feeds inbound frames into the node.
///
/// Teardown order matters: clearing the write fn drops the queue sender,
/// the writer drains whatever is left and exits, and only then is the node
/// detached from its registry.
pub(crate) async fn run_connection<S, N>(
    socket: WebSocketStream<S>,
    node: N,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    shutdown: CancellationToken,
) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    N: ConnectionNode,
{
    let (mut sink, mut stream) = socket.split();

    let text_frames = node.text_frames();
    let writer = tokio::spawn(async move {
        while let Some(raw) = outbound.recv().await {
            let frame = if text_frames {
                match String::from_utf8(raw) {
                    Ok(text) => Message::Text(text),
                    Err(err) => {
                        tracing::error!(error = %err, "text codec produced non-utf8 payload");
                        continue;
                    }
                }
            } else {
                Message::Binary(raw)
            };
            if sink.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut result = Ok(());
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => node.handle_raw(text.as_bytes()),
                Some(Ok(Message::Binary(raw))) => node.handle_raw(&raw),
                Some(Ok(Message::Close(_))) | None => break,
                // tungstenite answers pings during read; nothing to do
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "websocket read failed");
                    result = Err(err.into());
                    break;
                }
            },
        }
    }

    node.clear_write();
    node.detach();
    let _ = writer.await;
    result
}
