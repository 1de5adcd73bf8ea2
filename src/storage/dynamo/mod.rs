//! DynamoDB table store.
//!
//! Table schema:
//! - `PK` (String) partition key, `SK` (String) sort key
//! - secondary index (default `EntityTypeIndex`): `EntityType` hash key,
//!   `CreatedAt` range key
//!
//! The change feed is the table's own stream; it is consumed by the
//! processor binary, not produced here.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use super::{
    IndexQuery, Result, StorageError, TableKey, TableStore, WriteInstruction,
    INDEX_PARTITION_ATTR, PARTITION_KEY_ATTR, SORT_KEY_ATTR,
};
use crate::codec::AttributeMap;

mod convert;

use convert::{from_item, to_attribute_value, to_item};

/// Condition making update/delete fail on a missing item.
const ITEM_EXISTS: &str = "attribute_exists(PK)";

/// DynamoDB implementation of TableStore.
pub struct DynamoTableStore {
    client: Client,
    table_name: String,
    index_name: String,
}

impl DynamoTableStore {
    /// Create a new DynamoDB table store.
    pub async fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        endpoint_url: Option<&str>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(StorageError::Configuration(
                "storage.dynamo.table_name is required".to_string(),
            ));
        }

        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let client = if let Some(endpoint) = endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&config)
        };

        info!(table = %table_name, "Connected to DynamoDB");

        Ok(Self {
            client,
            table_name,
            index_name: index_name.into(),
        })
    }

    fn key(key: &TableKey) -> std::collections::HashMap<String, AttributeValue> {
        std::collections::HashMap::from([
            (PARTITION_KEY_ATTR.to_string(), AttributeValue::S(key.pk.clone())),
            (SORT_KEY_ATTR.to_string(), AttributeValue::S(key.sk.clone())),
        ])
    }
}

fn unavailable<E: std::fmt::Display>(operation: &str, e: E) -> StorageError {
    StorageError::Unavailable(format!("DynamoDB {operation} failed: {e}"))
}

#[async_trait]
impl TableStore for DynamoTableStore {
    async fn get(&self, key: &TableKey) -> Result<Option<AttributeMap>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(key)))
            .send()
            .await
            .map_err(|e| unavailable("get_item", e))?;

        match result.item {
            Some(item) => {
                debug!(key = %key, "Retrieved item from DynamoDB");
                Ok(Some(from_item(&item)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, item: AttributeMap) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(&item)))
            .send()
            .await
            .map_err(|e| unavailable("put_item", e))?;
        Ok(())
    }

    async fn update(
        &self,
        key: &TableKey,
        instruction: &WriteInstruction,
    ) -> Result<AttributeMap> {
        let values = instruction
            .attribute_values()
            .iter()
            .map(|(token, value)| (token.clone(), to_attribute_value(value)))
            .collect();

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(key)))
            .update_expression(instruction.expression())
            .condition_expression(ITEM_EXISTS)
            .set_expression_attribute_names(Some(instruction.attribute_names()))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(ref service)
                    if matches!(
                        service.err(),
                        UpdateItemError::ConditionalCheckFailedException(_)
                    ) =>
                {
                    StorageError::ConditionFailed
                }
                other => unavailable("update_item", other),
            })?;

        let attributes = result.attributes.unwrap_or_default();
        Ok(from_item(&attributes)?)
    }

    async fn delete(&self, key: &TableKey) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(key)))
            .condition_expression(ITEM_EXISTS)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(ref service)
                    if matches!(
                        service.err(),
                        DeleteItemError::ConditionalCheckFailedException(_)
                    ) =>
                {
                    StorageError::ConditionFailed
                }
                other => unavailable("delete_item", other),
            })?;
        Ok(())
    }

    async fn query_index(&self, query: &IndexQuery) -> Result<Vec<AttributeMap>> {
        let limit = i32::try_from(query.limit).unwrap_or(i32::MAX);

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.index_name)
            .key_condition_expression("#et = :et")
            .expression_attribute_names("#et", INDEX_PARTITION_ATTR)
            .expression_attribute_values(":et", AttributeValue::S(query.entity_type.clone()))
            .scan_index_forward(!query.newest_first)
            .limit(limit)
            .send()
            .await
            .map_err(|e| unavailable("query", e))?;

        let items = result
            .items
            .unwrap_or_default()
            .iter()
            .map(from_item)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            entity_type = %query.entity_type,
            count = items.len(),
            "Queried DynamoDB index"
        );
        Ok(items)
    }

    async fn health(&self) -> Result<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| unavailable("describe_table", e))?;
        Ok(())
    }
}
