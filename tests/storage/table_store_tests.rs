//! TableStore interface tests.
//!
//! These tests verify the contract of the TableStore trait.
//! Each storage implementation should run these tests. Keys and entity
//! types are unique per call so the suite can run against a shared table.

use itemstream::codec::{AttributeMap, Value};
use itemstream::storage::{
    Assignment, IndexQuery, StorageError, TableKey, TableStore, WriteInstruction,
};

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

fn item(key: &TableKey, entity_type: &str, created_at: i64) -> AttributeMap {
    AttributeMap::from([
        ("PK".to_string(), Value::from(key.pk.clone())),
        ("SK".to_string(), Value::from(key.sk.clone())),
        ("EntityType".to_string(), Value::from(entity_type)),
        ("Name".to_string(), Value::from("widget")),
        ("CreatedAt".to_string(), Value::from(created_at)),
    ])
}

fn fresh_key() -> TableKey {
    TableKey::new(format!("ITEM#{}", unique("")), "METADATA")
}

// =============================================================================
// get / put
// =============================================================================

pub async fn test_get_nonexistent<S: TableStore>(store: &S) {
    let result = store.get(&fresh_key()).await.expect("get should succeed");
    assert!(result.is_none(), "nonexistent item should be None");
}

pub async fn test_put_and_get<S: TableStore>(store: &S) {
    let key = fresh_key();
    let written = item(&key, "Contract", 100);

    store.put(written.clone()).await.expect("put should succeed");

    let read = store
        .get(&key)
        .await
        .expect("get should succeed")
        .expect("item should exist");
    assert_eq!(read, written, "should return stored attributes");
}

pub async fn test_put_replaces<S: TableStore>(store: &S) {
    let key = fresh_key();
    store.put(item(&key, "Contract", 100)).await.unwrap();

    let mut replacement = item(&key, "Contract", 100);
    replacement.insert("Name".to_string(), Value::from("gadget"));
    replacement.shift_remove("EntityType");
    store.put(replacement.clone()).await.unwrap();

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(read, replacement, "put should replace the whole item");
}

// =============================================================================
// update
// =============================================================================

pub async fn test_update_sets_only_assigned<S: TableStore>(store: &S) {
    let key = fresh_key();
    store.put(item(&key, "Contract", 100)).await.unwrap();

    let mut instruction = WriteInstruction::new();
    instruction.set(Assignment::new("Status", "status", Value::from("inactive")));
    instruction.set(Assignment::new("UpdatedAt", "updated_at", Value::from(101i64)));

    let updated = store
        .update(&key, &instruction)
        .await
        .expect("update should succeed");

    assert_eq!(updated["Status"], Value::from("inactive"));
    assert_eq!(updated["UpdatedAt"], Value::from(101i64));
    assert_eq!(updated["Name"], Value::from("widget"), "untouched field kept");

    let read = store.get(&key).await.unwrap().unwrap();
    assert_eq!(read, updated, "returned item should match stored item");
}

pub async fn test_update_nonexistent_fails<S: TableStore>(store: &S) {
    let key = fresh_key();
    let mut instruction = WriteInstruction::new();
    instruction.set(Assignment::new("Status", "status", Value::from("inactive")));

    let err = store.update(&key, &instruction).await.unwrap_err();
    assert!(
        matches!(err, StorageError::ConditionFailed),
        "update of missing item should fail its condition, got {err:?}"
    );
    assert!(store.get(&key).await.unwrap().is_none(), "no item created");
}

// =============================================================================
// delete
// =============================================================================

pub async fn test_delete<S: TableStore>(store: &S) {
    let key = fresh_key();
    store.put(item(&key, "Contract", 100)).await.unwrap();

    store.delete(&key).await.expect("delete should succeed");
    assert!(store.get(&key).await.unwrap().is_none());
}

pub async fn test_delete_nonexistent_fails<S: TableStore>(store: &S) {
    let err = store.delete(&fresh_key()).await.unwrap_err();
    assert!(matches!(err, StorageError::ConditionFailed));
}

// =============================================================================
// query_index
// =============================================================================

pub async fn test_query_newest_first_with_limit<S: TableStore>(store: &S) {
    let entity_type = unique("Contract");
    let keys: Vec<TableKey> = (0..3).map(|_| fresh_key()).collect();
    for (n, key) in keys.iter().enumerate() {
        store.put(item(key, &entity_type, 100 + n as i64)).await.unwrap();
    }

    let items = store
        .query_index(&IndexQuery::newest(&entity_type, 2))
        .await
        .expect("query should succeed");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["PK"], Value::from(keys[2].pk.clone()));
    assert_eq!(items[1]["PK"], Value::from(keys[1].pk.clone()));
}

pub async fn test_query_filters_by_entity_type<S: TableStore>(store: &S) {
    let wanted = unique("Contract");
    let other = unique("Other");
    let key = fresh_key();
    store.put(item(&key, &wanted, 100)).await.unwrap();
    store.put(item(&fresh_key(), &other, 200)).await.unwrap();

    let items = store
        .query_index(&IndexQuery::newest(&wanted, 10))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["PK"], Value::from(key.pk));
}

pub async fn test_query_empty<S: TableStore>(store: &S) {
    let items = store
        .query_index(&IndexQuery::newest(unique("Nothing"), 10))
        .await
        .unwrap();
    assert!(items.is_empty());
}

pub async fn test_health<S: TableStore>(store: &S) {
    store.health().await.expect("healthy store");
}

/// Run all TableStore interface tests.
#[macro_export]
macro_rules! run_table_store_tests {
    ($store:expr) => {
        use $crate::storage::table_store_tests::*;

        test_get_nonexistent($store).await;
        println!("  test_get_nonexistent: PASSED");

        test_put_and_get($store).await;
        println!("  test_put_and_get: PASSED");

        test_put_replaces($store).await;
        println!("  test_put_replaces: PASSED");

        test_update_sets_only_assigned($store).await;
        println!("  test_update_sets_only_assigned: PASSED");

        test_update_nonexistent_fails($store).await;
        println!("  test_update_nonexistent_fails: PASSED");

        test_delete($store).await;
        println!("  test_delete: PASSED");

        test_delete_nonexistent_fails($store).await;
        println!("  test_delete_nonexistent_fails: PASSED");

        test_query_newest_first_with_limit($store).await;
        println!("  test_query_newest_first_with_limit: PASSED");

        test_query_filters_by_entity_type($store).await;
        println!("  test_query_filters_by_entity_type: PASSED");

        test_query_empty($store).await;
        println!("  test_query_empty: PASSED");

        test_health($store).await;
        println!("  test_health: PASSED");
    };
}
