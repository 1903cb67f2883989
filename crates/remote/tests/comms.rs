//! Full client/remote loopback: both endpoints wired back to back with
//! synchronous in-process writes, no transport involved.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::json;

use objectlink_client::mocks::{MockSink, SinkEvent};
use objectlink_client::{ClientNode, ClientRegistry};
use objectlink_remote::mocks::MockSource;
use objectlink_remote::{RemoteNode, RemoteRegistry, SourceAdapter, SourceError};

/// Wire a client node and a remote node directly to each other.
fn pipe(client: &Arc<ClientNode>, remote: &Arc<RemoteNode>) {
    let to_remote = remote.clone();
    client.on_write(move |raw| to_remote.handle_message(&raw));
    let to_client = client.clone();
    remote.on_write(move |raw| to_client.handle_message(&raw));
}

/// A fresh client endpoint piped to its own connection node on `remote`.
fn connect(remote: &Arc<RemoteRegistry>) -> Arc<ClientNode> {
    let client = ClientNode::new(Arc::new(ClientRegistry::new()));
    let conn = RemoteNode::new(remote.clone());
    pipe(&client, &conn);
    client
}

/// A counter object: a read-write `count` property and an `increment`
/// method that bumps it and announces the change.
fn counter_source(registry: &Arc<RemoteRegistry>) -> Arc<SourceAdapter> {
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
    registry.add_source(adapter.clone());
    adapter
}

#[test]
fn counter_links_invokes_and_fans_out() {
    let remote = Arc::new(RemoteRegistry::new());
    counter_source(&remote);

    // first client links and sees the initial snapshot
    let client_a = connect(&remote);
    let sink_a = MockSink::new("demo.Counter");
    client_a.register_sink(sink_a.clone());
    client_a.link_remote("demo.Counter");
    assert_eq!(sink_a.properties().get("count"), Some(&json!(0)));

    // increment replies to the caller and fans the change out
    sink_a.invoke("increment", vec![]);
    assert!(sink_a.events().contains(&SinkEvent::InvokeReply {
        name: "demo.Counter/increment".into(),
        value: json!(1),
    }));
    assert_eq!(sink_a.properties().get("count"), Some(&json!(1)));

    // a late-joining client snapshots the current state
    let client_b = connect(&remote);
    let sink_b = MockSink::new("demo.Counter");
    client_b.register_sink(sink_b.clone());
    client_b.link_remote("demo.Counter");
    assert_eq!(sink_b.properties().get("count"), Some(&json!(1)));

    // further changes reach both clients
    sink_a.invoke("increment", vec![]);
    assert_eq!(sink_a.properties().get("count"), Some(&json!(2)));
    assert_eq!(sink_b.properties().get("count"), Some(&json!(2)));
}

#[test]
fn property_write_round_trips_through_the_source() {
    let remote = Arc::new(RemoteRegistry::new());
    counter_source(&remote);

    let client = connect(&remote);
    let sink = MockSink::new("demo.Counter");
    client.register_sink(sink.clone());
    client.link_remote("demo.Counter");

    client.set_remote_property("demo.Counter/count", json!(42));
    assert_eq!(sink.properties().get("count"), Some(&json!(42)));

    // writing the same value again produces no change notification
    let before = sink.events().len();
    client.set_remote_property("demo.Counter/count", json!(42));
    assert_eq!(sink.events().len(), before);
}

#[test]
fn calc_invoke_echoes_through_the_mock_source() {
    let remote = Arc::new(RemoteRegistry::new());
    let source = MockSource::new(remote.clone(), "demo.Calc");
    remote.add_source(source);

    let client = connect(&remote);
    let sink = MockSink::new("demo.Calc");
    client.register_sink(sink.clone());
    client.link_remote("demo.Calc");

    sink.invoke("add", vec![json!(5)]);
    assert!(sink.events().contains(&SinkEvent::InvokeReply {
        name: "demo.Calc/add".into(),
        value: json!("demo.Calc/add"),
    }));
}

#[test]
fn signals_reach_every_linked_client() {
    let remote = Arc::new(RemoteRegistry::new());
    let source = MockSource::new(remote.clone(), "demo.Counter");
    remote.add_source(source.clone());

    let client_a = connect(&remote);
    let sink_a = MockSink::new("demo.Counter");
    client_a.register_sink(sink_a.clone());
    client_a.link_remote("demo.Counter");

    let client_b = connect(&remote);
    let sink_b = MockSink::new("demo.Counter");
    client_b.register_sink(sink_b.clone());
    client_b.link_remote("demo.Counter");

    source.notify_signal("shutdown", vec![json!("now")]);

    let expected = SinkEvent::Signal {
        name: "demo.Counter/shutdown".into(),
        args: vec![json!("now")],
    };
    assert!(sink_a.events().contains(&expected));
    assert!(sink_b.events().contains(&expected));
}

#[test]
fn late_source_registration_does_not_auto_link() {
    let remote = Arc::new(RemoteRegistry::new());
    let client = connect(&remote);
    let sink = MockSink::new("demo.Counter");
    client.register_sink(sink.clone());

    // the link targets nothing and is dropped on the remote side
    client.link_remote("demo.Counter");
    assert!(sink.events().is_empty());

    // registering the source afterwards must not replay the link
    counter_source(&remote);
    assert!(sink.events().is_empty());
    assert!(remote.get_nodes("demo.Counter").is_empty());

    // a fresh client-initiated link works as usual
    client.link_remote("demo.Counter");
    assert_eq!(sink.properties().get("count"), Some(&json!(0)));
}

#[test]
fn nothing_flows_before_the_client_links() {
    let remote = Arc::new(RemoteRegistry::new());
    let source = MockSource::new(remote.clone(), "demo.Counter");
    remote.add_source(source.clone());

    let client = connect(&remote);
    let sink = MockSink::new("demo.Counter");
    client.register_sink(sink.clone());

    // registering a sink does not link; changes stay on the remote side
    source.notify_signal("shutdown", vec![]);
    remote.notify_property_changed("demo.Counter/count", json!(9));
    assert!(sink.events().is_empty());

    // unlink cuts the flow again
    client.link_remote("demo.Counter");
    client.unlink_remote("demo.Counter");
    let after_unlink = sink.events().len();
    source.notify_signal("shutdown", vec![]);
    assert_eq!(sink.events().len(), after_unlink);
}
