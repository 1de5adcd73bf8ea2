use serde_json::json;

use super::*;
use crate::codec::{encode_map, Image, WireValue};
use crate::metrics::MockMetricsSink;
use crate::stream::notifier::MockNotifier;

struct Fixture {
    dispatcher: Dispatcher,
    sink: Arc<MockMetricsSink>,
    notifier: Arc<MockNotifier>,
}

fn fixture() -> Fixture {
    let sink = Arc::new(MockMetricsSink::new());
    let notifier = Arc::new(MockNotifier::new());
    let metrics = Metrics::new(sink.clone(), "ItemStream", "test");
    let handler = Arc::new(ItemHandler::new(metrics, notifier.clone()));
    let registry = HandlerRegistry::new().register(EntityType::Item, handler);
    Fixture {
        dispatcher: Dispatcher::new(registry),
        sink,
        notifier,
    }
}

fn item_image(status: &str, updated_at: i64) -> AttributeMap {
    AttributeMap::from([
        ("PK".to_string(), Value::from("ITEM#abc")),
        ("SK".to_string(), Value::from("METADATA")),
        ("EntityType".to_string(), Value::from("Item")),
        ("ItemId".to_string(), Value::from("abc")),
        ("Name".to_string(), Value::from("widget")),
        ("Status".to_string(), Value::from(status)),
        ("CreatedAt".to_string(), Value::from(100i64)),
        ("UpdatedAt".to_string(), Value::from(updated_at)),
    ])
}

fn keys() -> Image {
    Image::from([
        ("PK".to_string(), WireValue::string("ITEM#abc")),
        ("SK".to_string(), WireValue::string("METADATA")),
    ])
}

fn record(
    kind: EventKind,
    old: Option<&AttributeMap>,
    new: Option<&AttributeMap>,
) -> StreamRecord {
    StreamRecord::new(kind, keys(), old.map(encode_map), new.map(encode_map))
}

#[tokio::test]
async fn test_insert_invokes_created_handler() {
    let f = fixture();
    let after = item_image("active", 100);

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Insert, None, Some(&after)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RecordOutcome::Success {
            event_type: "INSERT".to_string(),
            entity_type: Some("Item".to_string()),
            changed_fields: None,
        }
    );
    assert_eq!(f.sink.total(metrics::ITEMS_CREATED).await, 1.0);
    assert_eq!(
        f.notifier.notices().await,
        vec![Notice::Created {
            item_id: "abc".to_string(),
            name: Some("widget".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_modify_status_to_inactive_deactivates_once() {
    let f = fixture();
    let before = item_image("active", 100);
    let after = item_image("inactive", 110);

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Modify, Some(&before), Some(&after)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RecordOutcome::Success {
            event_type: "MODIFY".to_string(),
            entity_type: Some("Item".to_string()),
            changed_fields: Some(vec!["Status".to_string()]),
        }
    );
    assert_eq!(f.sink.total(metrics::ITEMS_MODIFIED).await, 1.0);
    assert_eq!(f.sink.total(metrics::ITEMS_DEACTIVATED).await, 1.0);
    assert_eq!(
        f.notifier.notices().await,
        vec![Notice::Deactivated {
            item_id: "abc".to_string(),
            previous_status: Some("active".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_modify_to_inactive_from_any_status_deactivates() {
    let f = fixture();
    let before = item_image("pending", 100);
    let after = item_image("inactive", 110);

    f.dispatcher
        .dispatch(&record(EventKind::Modify, Some(&before), Some(&after)))
        .await
        .unwrap();

    assert_eq!(f.sink.total(metrics::ITEMS_DEACTIVATED).await, 1.0);
    assert_eq!(
        f.notifier.notices().await,
        vec![Notice::Deactivated {
            item_id: "abc".to_string(),
            previous_status: Some("pending".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_modify_other_status_does_not_deactivate() {
    let f = fixture();
    let before = item_image("active", 100);
    let after = item_image("pending", 110);

    f.dispatcher
        .dispatch(&record(EventKind::Modify, Some(&before), Some(&after)))
        .await
        .unwrap();

    assert!(f.sink.named(metrics::ITEMS_DEACTIVATED).await.is_empty());
    assert!(f.notifier.notices().await.is_empty());
}

#[tokio::test]
async fn test_modify_without_status_change_does_not_deactivate() {
    let f = fixture();
    let before = item_image("inactive", 100);
    let mut after = item_image("inactive", 110);
    after.insert("Name".to_string(), Value::from("gadget"));

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Modify, Some(&before), Some(&after)))
        .await
        .unwrap();

    let RecordOutcome::Success { changed_fields, .. } = outcome else {
        panic!("expected success");
    };
    assert_eq!(changed_fields, Some(vec!["Name".to_string()]));
    assert!(f.notifier.notices().await.is_empty());
}

#[tokio::test]
async fn test_modify_reports_added_fields() {
    let f = fixture();
    let before = item_image("active", 100);
    let mut after = before.clone();
    after.insert("tag".to_string(), Value::from("v"));

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Modify, Some(&before), Some(&after)))
        .await
        .unwrap();

    let RecordOutcome::Success { changed_fields, .. } = outcome else {
        panic!("expected success");
    };
    assert_eq!(changed_fields, Some(vec!["tag".to_string()]));
}

#[tokio::test]
async fn test_remove_invokes_removed_handler() {
    let f = fixture();
    let before = item_image("active", 100);

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Remove, Some(&before), None))
        .await
        .unwrap();

    assert!(matches!(outcome, RecordOutcome::Success { ref event_type, .. } if event_type == "REMOVE"));
    assert_eq!(f.sink.total(metrics::ITEMS_DELETED).await, 1.0);
    assert_eq!(
        f.notifier.notices().await,
        vec![Notice::Removed {
            item_id: "abc".to_string()
        }]
    );
}

#[tokio::test]
async fn test_unknown_event_kind_is_skipped() {
    let f = fixture();
    let raw = json!({"eventName": "TTL_EXPIRE", "dynamodb": {}});

    let outcome = f.dispatcher.dispatch_raw(&raw).await.unwrap();

    assert_eq!(
        outcome,
        RecordOutcome::Skipped {
            event_type: "TTL_EXPIRE".to_string()
        }
    );
    assert!(f.sink.metrics().await.is_empty());
}

#[tokio::test]
async fn test_unknown_entity_type_is_noop_success() {
    let f = fixture();
    let mut after = item_image("active", 100);
    after.insert("EntityType".to_string(), Value::from("Order"));

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Insert, None, Some(&after)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RecordOutcome::Success {
            event_type: "INSERT".to_string(),
            entity_type: Some("Order".to_string()),
            changed_fields: None,
        }
    );
    assert!(f.sink.metrics().await.is_empty());
    assert!(f.notifier.notices().await.is_empty());
}

#[tokio::test]
async fn test_missing_image_decodes_as_empty_record() {
    let f = fixture();

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Insert, None, None))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        RecordOutcome::Success {
            event_type: "INSERT".to_string(),
            entity_type: None,
            changed_fields: None,
        }
    );
}

#[tokio::test]
async fn test_malformed_image_is_codec_error() {
    let f = fixture();
    let raw = json!({
        "eventName": "INSERT",
        "dynamodb": {"NewImage": {"EntityType": {"S": "Item", "N": "1"}}}
    });

    let err = f.dispatcher.dispatch_raw(&raw).await.unwrap_err();
    assert!(matches!(err, DispatchError::Codec(_)));
    assert!(err.to_string().contains("EntityType"));
}

#[tokio::test]
async fn test_unparseable_record_is_parse_error() {
    let f = fixture();
    let err = f
        .dispatcher
        .dispatch_raw(&json!({"dynamodb": {}}))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Parse(_)));
}

#[tokio::test]
async fn test_notifier_failure_fails_record() {
    let f = fixture();
    f.notifier.set_fail(true).await;
    let after = item_image("active", 100);

    let err = f
        .dispatcher
        .dispatch(&record(EventKind::Insert, None, Some(&after)))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Notify(_)));
}

#[tokio::test]
async fn test_metric_failure_does_not_fail_record() {
    let f = fixture();
    f.sink.set_fail(true).await;
    let after = item_image("active", 100);

    let outcome = f
        .dispatcher
        .dispatch(&record(EventKind::Insert, None, Some(&after)))
        .await
        .unwrap();
    assert!(!outcome.is_failed());
}

#[tokio::test]
async fn test_unregistered_known_type_is_noop() {
    let dispatcher = Dispatcher::new(HandlerRegistry::new());
    let after = item_image("active", 100);

    let outcome = dispatcher
        .dispatch(&record(EventKind::Insert, None, Some(&after)))
        .await
        .unwrap();
    assert!(!outcome.is_failed());
}

#[test]
fn test_outcome_serialization() {
    let success = RecordOutcome::Success {
        event_type: "MODIFY".to_string(),
        entity_type: Some("Item".to_string()),
        changed_fields: Some(vec!["Status".to_string()]),
    };
    assert_eq!(
        serde_json::to_value(&success).unwrap(),
        json!({"status": "success", "event_type": "MODIFY", "entity_type": "Item", "changed_fields": ["Status"]})
    );

    let insert = RecordOutcome::Success {
        event_type: "INSERT".to_string(),
        entity_type: None,
        changed_fields: None,
    };
    assert_eq!(
        serde_json::to_value(&insert).unwrap(),
        json!({"status": "success", "event_type": "INSERT", "entity_type": null})
    );

    let failed = RecordOutcome::Failed {
        error: "boom".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&failed).unwrap(),
        json!({"status": "failed", "error": "boom"})
    );
}
