//! Error handling and edge case tests.

use serde_json::json;
use std::time::Duration;
use transceiver::{
    ChannelTransport, ChannelTransportConfig, ConnectionId, Filter, NotificationKind,
    SubscriptionRegistry, Transceiver, TransceiverConfig, TransceiverError,
};

fn hub() -> Transceiver<ChannelTransport> {
    Transceiver::in_process(TransceiverConfig::default())
}

// --- Input Validation ---

#[test]
fn test_empty_collection_fails_fast() {
    let hub = hub();
    let a = hub.open("A");
    let session = hub.session(&a.id).unwrap();

    assert!(matches!(
        session.subscribe("", None),
        Err(TransceiverError::InvalidCollection(_))
    ));
    assert!(matches!(
        hub.notify_updated("", &json!({}), &json!({})),
        Err(TransceiverError::InvalidCollection(_))
    ));
    assert!(matches!(
        hub.notify_deleted("", &json!({})),
        Err(TransceiverError::InvalidCollection(_))
    ));

    // Nothing was joined.
    assert!(hub.transport().rooms_of(&a.id).is_empty());
}

#[test]
fn test_non_scalar_filter_still_subscribes() {
    let registry = SubscriptionRegistry::new();
    let filter = Filter::new().with("tags", json!(["a", "b"])).with("meta", json!({"x": 1}));
    let key = registry
        .subscribe("model", &ConnectionId::from("a"), Some(&filter))
        .unwrap();
    assert_eq!(key.as_str(), r#""meta":{"x":1},"tags":["a","b"]"#);

    // Compound values never equal anything, so only listing without an item sees it.
    assert!(registry
        .list_groups("model", Some(&json!({"tags": ["a", "b"], "meta": {"x": 1}})))
        .is_empty());
    assert_eq!(registry.list_groups("model", None), vec![key]);
}

// --- Absent State ---

#[test]
fn test_unsubscribe_unknown_collection() {
    let hub = hub();
    let a = hub.open("A");
    let room = hub
        .session(&a.id)
        .unwrap()
        .unsubscribe("nothing", Some(&Filter::new().with("id", 1)))
        .unwrap();
    assert_eq!(room.as_str(), r#"transceiver_nothing:"id":1"#);
}

#[test]
fn test_disconnect_unknown_connection() {
    let hub = hub();
    assert!(!hub.disconnect(&ConnectionId::from("ghost")));
    assert!(hub.registry().remove_connection(&ConnectionId::from("ghost")).is_empty());
}

#[test]
fn test_session_for_closed_connection() {
    let hub = hub();
    let a = hub.open("A");
    hub.close(&a.id);

    assert!(matches!(
        hub.session(&a.id),
        Err(TransceiverError::ConnectionNotFound(_))
    ));
}

// --- Item Shapes ---

#[test]
fn test_item_missing_filtered_field() {
    let hub = hub();
    let a = hub.open("A");
    hub.session(&a.id)
        .unwrap()
        .subscribe("model", Some(&Filter::new().with("color", "blue")))
        .unwrap();

    // Neither snapshot has the field: the group is not affected at all.
    let partition = hub
        .notify_updated("model", &json!({"id": 1}), &json!({"id": 1, "size": 2}))
        .unwrap();
    assert!(partition.is_empty());
    assert!(a.recv_timeout(Duration::from_millis(20)).is_err());
}

#[test]
fn test_item_without_id() {
    let hub = hub();
    let a = hub.open("A");
    hub.session(&a.id).unwrap().subscribe("model", None).unwrap();

    hub.notify_created("model", &json!({"color": "blue"})).unwrap();
    let envelope = a.recv_timeout(Duration::from_millis(100)).unwrap();
    assert!(envelope.payload.id.is_null());
}

#[test]
fn test_string_and_number_do_not_match() {
    let hub = hub();
    let a = hub.open("A");
    hub.session(&a.id)
        .unwrap()
        .subscribe("model", Some(&Filter::new().with("id", 1)))
        .unwrap();

    assert_eq!(hub.notify_created("model", &json!({"id": "1"})).unwrap(), 0);
    assert_eq!(hub.notify_created("model", &json!({"id": 1})).unwrap(), 1);
}

// --- Transport Failures ---

#[test]
fn test_slow_consumer_loses_events_not_subscriptions() {
    let transport = std::sync::Arc::new(ChannelTransport::with_config(ChannelTransportConfig {
        buffer_size: 1,
    }));
    let hub = Transceiver::new(TransceiverConfig::default(), transport.clone());
    let handle = transport.connect("A");
    hub.connect(&handle.id);
    hub.session(&handle.id).unwrap().subscribe("order", None).unwrap();

    for i in 0..5 {
        hub.notify_created("order", &json!({"id": i})).unwrap();
    }

    let delivered = handle.drain();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].event, NotificationKind::Create);
    assert!(hub.registry().is_subscribed("order", &handle.id, None));
}
