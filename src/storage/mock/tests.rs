use crate::codec::{AttributeMap, Value};
use crate::storage::{
    Assignment, IndexQuery, StorageError, TableKey, TableStore, WriteInstruction,
};
use crate::stream::EventKind;

use super::*;

fn item(id: &str, entity_type: &str, created_at: i64) -> AttributeMap {
    AttributeMap::from([
        ("PK".to_string(), Value::from(format!("ITEM#{id}"))),
        ("SK".to_string(), Value::from("METADATA")),
        ("EntityType".to_string(), Value::from(entity_type)),
        ("Name".to_string(), Value::from(id)),
        ("CreatedAt".to_string(), Value::from(created_at)),
    ])
}

fn key(id: &str) -> TableKey {
    TableKey::new(format!("ITEM#{id}"), "METADATA")
}

fn rename(name: &str) -> WriteInstruction {
    let mut instruction = WriteInstruction::new();
    instruction.set(Assignment::new("Name", "name", Value::from(name)));
    instruction
}

#[tokio::test]
async fn test_mock_put_and_get() {
    let store = MockTableStore::new();
    store.put(item("a", "Item", 100)).await.unwrap();

    let fetched = store.get(&key("a")).await.unwrap().unwrap();
    assert_eq!(fetched["Name"], Value::from("a"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_mock_put_requires_key_attributes() {
    let store = MockTableStore::new();
    let mut keyless = item("a", "Item", 100);
    keyless.shift_remove("SK");

    let err = store.put(keyless).await.unwrap_err();
    assert!(matches!(err, StorageError::MissingKey("SK")));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_mock_update_missing_item_fails_condition() {
    let store = MockTableStore::new();
    let err = store.update(&key("missing"), &rename("x")).await.unwrap_err();
    assert!(matches!(err, StorageError::ConditionFailed));
    assert!(store.is_empty().await, "update must not create an item");
}

#[tokio::test]
async fn test_mock_delete_twice_fails_condition() {
    let store = MockTableStore::new();
    store.put(item("a", "Item", 100)).await.unwrap();

    store.delete(&key("a")).await.unwrap();
    let err = store.delete(&key("a")).await.unwrap_err();
    assert!(matches!(err, StorageError::ConditionFailed));
}

#[tokio::test]
async fn test_mock_query_index_newest_first_with_limit() {
    let store = MockTableStore::new();
    store.put(item("old", "Item", 100)).await.unwrap();
    store.put(item("new", "Item", 300)).await.unwrap();
    store.put(item("mid", "Item", 200)).await.unwrap();
    store.put(item("other", "Order", 400)).await.unwrap();

    let results = store
        .query_index(&IndexQuery::newest("Item", 2))
        .await
        .unwrap();

    let names: Vec<_> = results.iter().map(|i| i["Name"].clone()).collect();
    assert_eq!(names, vec![Value::from("new"), Value::from("mid")]);
}

#[tokio::test]
async fn test_mock_query_index_ties_break_by_write_order() {
    let store = MockTableStore::new();
    store.put(item("first", "Item", 100)).await.unwrap();
    store.put(item("second", "Item", 100)).await.unwrap();

    let results = store
        .query_index(&IndexQuery::newest("Item", 10))
        .await
        .unwrap();
    assert_eq!(results[0]["Name"], Value::from("second"));
}

#[tokio::test]
async fn test_mock_index_is_sparse() {
    let store = MockTableStore::new();
    let mut unsorted = item("a", "Item", 100);
    unsorted.shift_remove("CreatedAt");
    store.put(unsorted).await.unwrap();

    let results = store
        .query_index(&IndexQuery::newest("Item", 10))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_mock_change_feed_records_mutations() {
    let store = MockTableStore::new();
    store.put(item("a", "Item", 100)).await.unwrap();
    store.update(&key("a"), &rename("renamed")).await.unwrap();
    store.delete(&key("a")).await.unwrap();

    let feed = store.take_change_feed().await;
    let kinds: Vec<_> = feed.iter().map(|r| r.event_name.clone()).collect();
    assert_eq!(kinds, vec!["INSERT", "MODIFY", "REMOVE"]);

    assert_eq!(feed[0].kind(), Some(EventKind::Insert));
    assert!(feed[0].dynamodb.old_image.is_none());
    assert!(feed[0].dynamodb.new_image.is_some());

    let modify = &feed[1].dynamodb;
    assert_eq!(
        modify.old_image.as_ref().unwrap()["Name"].s.as_deref(),
        Some("a")
    );
    assert_eq!(
        modify.new_image.as_ref().unwrap()["Name"].s.as_deref(),
        Some("renamed")
    );

    assert!(feed[2].dynamodb.new_image.is_none());
    assert!(store.change_feed().await.is_empty(), "feed was drained");
}

#[tokio::test]
async fn test_mock_failed_writes_do_not_record_changes() {
    let store = MockTableStore::new();
    store.set_fail_on_write(true).await;

    let err = store.put(item("a", "Item", 100)).await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert!(store.change_feed().await.is_empty());
}

#[tokio::test]
async fn test_mock_fail_on_read() {
    let store = MockTableStore::new();
    store.set_fail_on_read(true).await;

    assert!(matches!(
        store.get(&key("a")).await,
        Err(StorageError::Unavailable(_))
    ));
    assert!(store.health().await.is_err());

    store.set_fail_on_read(false).await;
    assert!(store.health().await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mock_change_feed_follows_commit_order_under_contention() {
    let store = std::sync::Arc::new(MockTableStore::new());
    store.put(item("a", "Item", 100)).await.unwrap();
    store.take_change_feed().await;

    let mut writers = tokio::task::JoinSet::new();
    for n in 0..32 {
        let store = store.clone();
        writers.spawn(async move {
            store.update(&key("a"), &rename(&format!("name-{n}"))).await.unwrap();
        });
    }
    while let Some(joined) = writers.join_next().await {
        joined.unwrap();
    }

    let feed = store.take_change_feed().await;
    assert_eq!(feed.len(), 32);

    let name = |image: &Option<crate::codec::Image>| {
        image.as_ref().unwrap()["Name"].s.clone().unwrap()
    };
    for pair in feed.windows(2) {
        assert_eq!(
            name(&pair[0].dynamodb.new_image),
            name(&pair[1].dynamodb.old_image),
            "each record must start from the previous record's after-image"
        );
        assert!(pair[0].dynamodb.sequence_number < pair[1].dynamodb.sequence_number);
    }

    let stored = store.get(&key("a")).await.unwrap().unwrap();
    assert_eq!(
        stored["Name"].as_str(),
        Some(name(&feed[31].dynamodb.new_image).as_str())
    );
}
