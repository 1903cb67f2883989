//! End-to-end over a real WebSocket: server registry with a counter
//! source, two clients linking, invoking, and observing fan-out.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use objectlink_client::mocks::{MockSink, SinkEvent};
use objectlink_client::{ClientNode, ClientRegistry};
use objectlink_remote::{RemoteRegistry, SourceAdapter, SourceError};
use objectlink_ws::{WsClient, WsServer};

fn counter_source(registry: &Arc<RemoteRegistry>) {
    let count = Arc::new(AtomicI64::new(0));
    let get_count = count.clone();
    let set_count = count.clone();
    let inc_count = count;
    let inc_registry = registry.clone();
    let adapter = SourceAdapter::builder("demo.Counter")
        .property(
            "count",
            move || json!(get_count.load(Ordering::SeqCst)),
            move |value| {
                let next = value
                    .as_i64()
                    .ok_or_else(|| SourceError::InvalidArgs("count must be an integer".into()))?;
                let previous = set_count.swap(next, Ordering::SeqCst);
                Ok((previous != next).then(|| json!(next)))
            },
        )
        .method("increment", move |_| {
            let next = inc_count.fetch_add(1, Ordering::SeqCst) + 1;
            inc_registry.notify_property_changed("demo.Counter/count", json!(next));
            Ok(json!(next))
        })
        .build(registry.clone());
    registry.add_source(adapter);
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within 5s");
}

#[tokio::test]
async fn counter_round_trip_with_two_clients() {
    let remote = Arc::new(RemoteRegistry::new());
    counter_source(&remote);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let server = WsServer::new(remote);
    let server_shutdown = shutdown.clone();
    let server_task =
        tokio::spawn(async move { server.serve(listener, server_shutdown).await });

    // first client: link before the pump runs; the LINK is queued
    let node_a = ClientNode::new(Arc::new(ClientRegistry::new()));
    let sink_a = MockSink::new("demo.Counter");
    node_a.register_sink(sink_a.clone());
    let conn_a = WsClient::new(format!("ws://{addr}"), node_a.clone())
        .connect()
        .await
        .unwrap();
    node_a.link_remote("demo.Counter");
    let pump_a = conn_a.spawn(shutdown.child_token());

    wait_until(|| sink_a.properties().get("count") == Some(&json!(0))).await;

    // increment: reply to the caller, change fanned out
    let reply = node_a
        .invoke_remote_async("demo.Counter/increment", vec![])
        .await
        .unwrap();
    assert_eq!(reply.value, json!(1));
    wait_until(|| sink_a.properties().get("count") == Some(&json!(1))).await;

    // late joiner snapshots the current state
    let node_b = ClientNode::new(Arc::new(ClientRegistry::new()));
    let sink_b = MockSink::new("demo.Counter");
    node_b.register_sink(sink_b.clone());
    let conn_b = WsClient::new(format!("ws://{addr}"), node_b.clone())
        .connect()
        .await
        .unwrap();
    node_b.link_remote("demo.Counter");
    let pump_b = conn_b.spawn(shutdown.child_token());

    wait_until(|| sink_b.properties().get("count") == Some(&json!(1))).await;

    // further changes reach both clients
    sink_a.invoke("increment", vec![]);
    wait_until(|| sink_a.properties().get("count") == Some(&json!(2))).await;
    wait_until(|| sink_b.properties().get("count") == Some(&json!(2))).await;
    assert!(sink_a.events().contains(&SinkEvent::InvokeReply {
        name: "demo.Counter/increment".into(),
        value: json!(2),
    }));

    // property write through the wire
    node_b.set_remote_property("demo.Counter/count", json!(10));
    wait_until(|| sink_a.properties().get("count") == Some(&json!(10))).await;
    wait_until(|| sink_b.properties().get("count") == Some(&json!(10))).await;

    shutdown.cancel();
    pump_a.await.unwrap().unwrap();
    pump_b.await.unwrap().unwrap();
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn peer_close_detaches_the_remote_node() {
    let remote = Arc::new(RemoteRegistry::new());
    counter_source(&remote);
    let fanout = remote.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let server = WsServer::new(remote);
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move { server.serve(listener, server_shutdown).await });

    let node = ClientNode::new(Arc::new(ClientRegistry::new()));
    let sink = MockSink::new("demo.Counter");
    node.register_sink(sink.clone());
    let conn = WsClient::new(format!("ws://{addr}"), node.clone())
        .connect()
        .await
        .unwrap();
    node.link_remote("demo.Counter");
    let client_shutdown = shutdown.child_token();
    let pump = conn.spawn(client_shutdown.clone());
    wait_until(|| sink.properties().get("count") == Some(&json!(0))).await;
    assert_eq!(fanout.get_nodes("demo.Counter").len(), 1);

    // closing the client side unlinks its node on the server
    client_shutdown.cancel();
    pump.await.unwrap().unwrap();
    wait_until(|| fanout.get_nodes("demo.Counter").is_empty()).await;

    shutdown.cancel();
}
