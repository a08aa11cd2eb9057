//! Integration tests for reads and live subscriptions against the in-memory
//! store.

use std::{
    sync::{Arc, mpsc},
    thread,
    time::Duration,
};

use umadb::{
    AppendRequest, Client, Error, Event, Query, QueryItem, ReadRequest,
    channel::{Code, Failure, inmemory::Store},
};

// ============================================================================
// Helpers
// ============================================================================

fn connected(store: &Store) -> Client<Store> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut client = Client::new(store.clone());
    client.connect().unwrap();
    client
}

fn append(client: &Client<Store>, kind: &str, tag: &str) -> u64 {
    let event = Event::tagged(kind, tag, format!("{kind}:{tag}")).unwrap();
    client
        .append(&AppendRequest::new(vec![event]).unwrap())
        .unwrap()
        .position
}

fn positions(client: &Client<Store>, request: &ReadRequest) -> Vec<u64> {
    client
        .read(request)
        .unwrap()
        .events()
        .map(|event| event.unwrap().position)
        .collect()
}

// ============================================================================
// Historical reads
// ============================================================================

#[test]
fn forward_read_is_ordered_and_filtered() {
    let store = Store::new();
    let client = connected(&store);
    for (kind, tag) in [("a", "x"), ("b", "x"), ("a", "y"), ("a", "x")] {
        append(&client, kind, tag);
    }

    let query = Query::of(QueryItem::of(["a"], ["x"]));

    assert_eq!(positions(&client, &ReadRequest::of(query)), vec![1, 4]);
}

#[test]
fn query_items_are_alternatives() {
    let store = Store::new();
    let client = connected(&store);
    for (kind, tag) in [("a", "x"), ("b", "y"), ("c", "z")] {
        append(&client, kind, tag);
    }

    let query = Query::of(QueryItem::of_types(["a"])).and(QueryItem::of_tags(["z"]));

    assert_eq!(positions(&client, &ReadRequest::of(query)), vec![1, 3]);
}

#[test]
fn backwards_read_with_limit_returns_latest_first() {
    let store = Store::new();
    let client = connected(&store);
    for _ in 0..6 {
        append(&client, "tick", "clock");
    }

    let request = ReadRequest::all().backwards().with_limit(3).unwrap();

    assert_eq!(positions(&client, &request), vec![6, 5, 4]);
}

#[test]
fn start_is_inclusive() {
    let store = Store::new();
    let client = connected(&store);
    for _ in 0..4 {
        append(&client, "tick", "clock");
    }

    let request = ReadRequest::all().with_start(3).unwrap();

    assert_eq!(positions(&client, &request), vec![3, 4]);
}

#[test]
fn batches_report_head() {
    let store = Store::new();
    let client = connected(&store);
    for _ in 0..3 {
        append(&client, "tick", "clock");
    }

    let batches: Vec<_> = client
        .read(&ReadRequest::all().with_batch_size(2).unwrap())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|batch| batch.head == Some(3)));
}

#[test]
fn consumer_may_stop_early() {
    let store = Store::new();
    let client = connected(&store);
    for tag in ["x", "y", "target", "z"] {
        append(&client, "e", tag);
    }

    let found = client
        .read(&ReadRequest::all().with_batch_size(1).unwrap())
        .unwrap()
        .events()
        .map(Result::unwrap)
        .find(|event| event.event.has_tag("target"));

    assert_eq!(found.map(|event| event.position), Some(3));
    assert_eq!(client.head().unwrap(), Some(4));
}

#[test]
fn mid_stream_failure_is_raised_not_swallowed() {
    let store = Store::new();
    let client = connected(&store);
    for _ in 0..4 {
        append(&client, "tick", "clock");
    }

    let mut stream = client
        .read(&ReadRequest::all().with_batch_size(2).unwrap())
        .unwrap();
    assert_eq!(stream.next().unwrap().unwrap().events.len(), 2);

    store.fail_next(Failure::new(Code::DataLoss, "segment unreadable"));

    assert!(matches!(stream.next(), Some(Err(Error::Corruption(_)))));
    assert!(stream.next().is_none());
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn subscription_waits_for_the_next_matching_event() {
    let store = Store::new();
    let client = Arc::new(connected(&store));
    append(&client, "history", "x");
    let head = client.head().unwrap().unwrap();

    let request = ReadRequest::of(Query::of(QueryItem::of_types(["live"])))
        .with_start(i64::try_from(head + 1).unwrap())
        .unwrap()
        .subscribe();
    let mut stream = client.read(&request).unwrap();

    let (tx, rx) = mpsc::channel();
    let subscriber = thread::spawn(move || {
        let batch = stream.next().unwrap().unwrap();
        tx.send(batch).unwrap();
    });

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    let producer = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            append(&client, "unrelated", "x");
            append(&client, "live", "x")
        })
    };
    let appended = producer.join().unwrap();

    let batch = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    subscriber.join().unwrap();
    assert_eq!(batch.events.len(), 1);
    assert_eq!(batch.events[0].position, appended);
    assert!(batch.events[0].position > head);
}

#[test]
fn subscription_catches_up_before_going_live() {
    let store = Store::new();
    let client = connected(&store);
    append(&client, "e", "x");
    append(&client, "e", "x");

    let mut events = client
        .read(&ReadRequest::all().subscribe())
        .unwrap()
        .events();
    let historical: Vec<u64> = events
        .by_ref()
        .take(2)
        .map(|event| event.unwrap().position)
        .collect();

    append(&client, "e", "x");

    assert_eq!(historical, vec![1, 2]);
    assert_eq!(events.next().unwrap().unwrap().position, 3);
}

#[test]
fn shutdown_ends_subscription_with_error() {
    let store = Store::new();
    let mut client = connected(&store);
    let mut stream = client.read(&ReadRequest::all().subscribe()).unwrap();

    let subscriber = thread::spawn(move || stream.next());
    thread::sleep(Duration::from_millis(20));
    client.shutdown().unwrap();

    let result = subscriber.join().unwrap();
    assert!(matches!(result, Some(Err(Error::Other { .. }))));
}

#[test]
fn backwards_subscription_is_rejected_by_the_store() {
    let store = Store::new();
    let client = connected(&store);

    let error = client
        .read(&ReadRequest::all().backwards().subscribe())
        .unwrap_err();

    assert!(matches!(error, Error::Serialization(_)));
}
