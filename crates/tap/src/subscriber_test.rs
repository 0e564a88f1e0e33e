//! Tests for the subscriber registry

use super::*;
use serde_json::json;

use crate::throttle::Offer;

fn event(value: serde_json::Value) -> Arc<Event> {
    Arc::new(Event::from_value(value))
}

// ============================================================================
// Add / remove
// ============================================================================

#[test]
fn test_add_creates_subscriber_without_predicate() {
    let registry = SubscriberRegistry::default();

    let (id, _rx) = registry.add().unwrap();
    assert_eq!(registry.count(), 1);
    assert!(registry.contains(id));
    assert!(registry.predicate(id).unwrap().is_none());
}

#[test]
fn test_add_unique_ids() {
    let registry = SubscriberRegistry::default();

    let (id1, _rx1) = registry.add().unwrap();
    let (id2, _rx2) = registry.add().unwrap();

    assert_ne!(id1, id2);
    assert!(id2 > id1);
    assert_eq!(registry.count(), 2);
}

#[test]
fn test_ids_are_registry_local() {
    let a = SubscriberRegistry::default();
    let b = SubscriberRegistry::default();

    let (id_a, _rx_a) = a.add().unwrap();
    let (id_b, _rx_b) = b.add().unwrap();
    assert_eq!(id_a, id_b);
}

#[test]
fn test_ids_not_reused_after_remove() {
    let registry = SubscriberRegistry::default();

    let (id1, _rx1) = registry.add().unwrap();
    registry.remove(id1).unwrap();
    let (id2, _rx2) = registry.add().unwrap();
    assert_ne!(id1, id2);
}

#[test]
fn test_max_subscribers() {
    let registry = SubscriberRegistry::new(RegistryConfig {
        max_subscribers: 2,
        ..RegistryConfig::default()
    });

    let (_id1, _rx1) = registry.add().unwrap();
    let (id2, _rx2) = registry.add().unwrap();
    assert!(matches!(
        registry.add(),
        Err(TapError::MaxSubscribers { max: 2 })
    ));

    registry.remove(id2).unwrap();
    assert!(registry.add().is_ok());
}

#[test]
fn test_remove_closes_channel() {
    let registry = SubscriberRegistry::default();
    let (id, _rx) = registry.add().unwrap();
    let handle = registry.snapshot().pop().unwrap();

    registry.remove(id).unwrap();

    assert!(registry.is_empty());
    assert!(handle.sender.is_closed());
    assert_eq!(handle.sender.offer(event(json!({}))), Offer::Closed);
}

#[test]
fn test_remove_not_found() {
    let registry = SubscriberRegistry::default();
    let (id, _rx) = registry.add().unwrap();
    registry.remove(id).unwrap();

    assert!(matches!(
        registry.remove(id),
        Err(TapError::SubscriberNotFound { id: missing }) if missing == id
    ));
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_update_filter_installs_and_clears() {
    let registry = SubscriberRegistry::default();
    let ops = OperatorRegistry::new();
    let (id, _rx) = registry.add().unwrap();

    let update = registry
        .update_filter(id, r#"{"contains": [{"var": "tweet"}, "rust"]}"#, &ops)
        .unwrap();
    assert_eq!(update, FilterUpdate::Installed);
    assert!(registry.predicate(id).unwrap().is_some());

    assert_eq!(registry.update_filter(id, "", &ops).unwrap(), FilterUpdate::Cleared);
    assert!(registry.predicate(id).unwrap().is_none());
}

#[test]
fn test_rejected_filter_keeps_previous_predicate() {
    let registry = SubscriberRegistry::default();
    let ops = OperatorRegistry::new();
    let (id, _rx) = registry.add().unwrap();

    let rule = json!({"==": [{"var": "lang"}, "en"]});
    registry.update_filter(id, &rule.to_string(), &ops).unwrap();

    let err = registry
        .update_filter(id, r#"{"regex": [{"var": "tweet"}, "("]}"#, &ops)
        .unwrap_err();
    assert!(matches!(err, TapError::Predicate(_)));

    let kept = registry.predicate(id).unwrap().unwrap();
    assert_eq!(kept.rule(), &rule);
}

#[test]
fn test_update_filter_unknown_subscriber() {
    let registry = SubscriberRegistry::default();
    let ops = OperatorRegistry::new();

    let (id, _rx) = registry.add().unwrap();
    registry.remove(id).unwrap();

    assert!(matches!(
        registry.update_filter(id, "true", &ops),
        Err(TapError::SubscriberNotFound { .. })
    ));
}

// ============================================================================
// Snapshot and teardown
// ============================================================================

#[test]
fn test_snapshot_is_a_copy() {
    let registry = SubscriberRegistry::default();
    let ops = OperatorRegistry::new();
    let (id, _rx) = registry.add().unwrap();

    let before = registry.snapshot();
    registry.update_filter(id, "false", &ops).unwrap();

    assert_eq!(before.len(), 1);
    assert!(before[0].predicate.is_none());
    assert!(registry.snapshot()[0].predicate.is_some());
}

#[tokio::test]
async fn test_remove_after_snapshot_discards_delivery() {
    let registry = SubscriberRegistry::default();
    let (id, mut rx) = registry.add().unwrap();

    let snapshot = registry.snapshot();
    registry.remove(id).unwrap();

    let event = Arc::new(Event::from_value(json!({"tweet": "late"})));
    assert_eq!(snapshot[0].sender.offer(event), Offer::Closed);
    assert!(rx.recv().await.is_none());
}

#[test]
fn test_remove_closed_prunes_dropped_receivers() {
    let registry = SubscriberRegistry::default();
    let (_id1, rx1) = registry.add().unwrap();
    let (id2, _rx2) = registry.add().unwrap();

    drop(rx1);
    assert_eq!(registry.remove_closed(), 1);
    assert_eq!(registry.count(), 1);
    assert!(registry.contains(id2));
}

#[tokio::test]
async fn test_close_all_ends_every_receiver() {
    let registry = SubscriberRegistry::default();
    let (_id1, mut rx1) = registry.add().unwrap();
    let (_id2, mut rx2) = registry.add().unwrap();

    assert_eq!(registry.close_all(), 2);
    assert!(registry.is_empty());
    assert!(rx1.recv().await.is_none());
    assert!(rx2.recv().await.is_none());
}
