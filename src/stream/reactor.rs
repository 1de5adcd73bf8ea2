//! Batch reactor.
//!
//! Runs each record of a delivered batch through the [`Dispatcher`] in
//! delivery order. A failing record is recorded in the summary and the
//! batch carries on; the reactor itself never fails.

use serde::Serialize;
use tracing::{error, info};

use super::dispatcher::{Dispatcher, RecordOutcome};
use super::record::StreamBatch;
use crate::metrics::{self, Metrics};

/// Summary message of every processed batch.
pub const SUMMARY_MESSAGE: &str = "Processing complete";

/// Result of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub message: String,
    pub total_records: usize,
    #[serde(rename = "successful")]
    pub successful_count: usize,
    #[serde(rename = "failed")]
    pub failed_count: usize,
    /// One entry per record, in delivery order.
    pub results: Vec<RecordOutcome>,
}

/// Processes change-feed batches.
#[derive(Clone)]
pub struct BatchReactor {
    dispatcher: Dispatcher,
    metrics: Metrics,
}

impl BatchReactor {
    pub fn new(dispatcher: Dispatcher, metrics: Metrics) -> Self {
        Self {
            dispatcher,
            metrics,
        }
    }

    pub async fn process_batch(&self, batch: &StreamBatch) -> BatchSummary {
        info!(records = batch.len(), "Processing batch");

        let mut results = Vec::with_capacity(batch.len());
        let mut successful_count = 0;
        let mut failed_count = 0;

        for (index, raw) in batch.records.iter().enumerate() {
            match self.dispatcher.dispatch_raw(raw).await {
                Ok(outcome) => {
                    successful_count += 1;
                    results.push(outcome);
                }
                Err(e) => {
                    error!(index, error = %e, record = %raw, "Error processing record");
                    failed_count += 1;
                    results.push(RecordOutcome::Failed {
                        error: e.to_string(),
                    });
                    self.metrics.count(metrics::PROCESSING_ERRORS, 1).await;
                }
            }
        }

        self.metrics
            .count(metrics::RECORDS_PROCESSED, successful_count as u64)
            .await;

        info!(
            successful = successful_count,
            failed = failed_count,
            "Processing complete"
        );

        BatchSummary {
            message: SUMMARY_MESSAGE.to_string(),
            total_records: batch.len(),
            successful_count,
            failed_count,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::metrics::MockMetricsSink;
    use crate::store::EntityType;
    use crate::stream::dispatcher::{HandlerRegistry, ItemHandler};
    use crate::stream::notifier::MockNotifier;

    fn reactor() -> (BatchReactor, Arc<MockMetricsSink>) {
        let sink = Arc::new(MockMetricsSink::new());
        let metrics = Metrics::new(sink.clone(), "ItemStream", "test");
        let handler = Arc::new(ItemHandler::new(metrics.clone(), Arc::new(MockNotifier::new())));
        let dispatcher = Dispatcher::new(HandlerRegistry::new().register(EntityType::Item, handler));
        (BatchReactor::new(dispatcher, metrics), sink)
    }

    fn insert(id: &str) -> serde_json::Value {
        json!({
            "eventName": "INSERT",
            "dynamodb": {"NewImage": {
                "EntityType": {"S": "Item"},
                "ItemId": {"S": id},
                "CreatedAt": {"N": "100"}
            }}
        })
    }

    fn malformed() -> serde_json::Value {
        json!({
            "eventName": "INSERT",
            "dynamodb": {"NewImage": {"EntityType": {}}}
        })
    }

    #[tokio::test]
    async fn test_one_malformed_record_is_isolated() {
        let (reactor, _) = reactor();
        let batch = StreamBatch {
            records: vec![insert("a"), malformed(), insert("c")],
        };

        let summary = reactor.process_batch(&batch).await;

        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.successful_count, 2);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.results.len(), 3);
        assert!(!summary.results[0].is_failed());
        assert!(summary.results[1].is_failed());
        assert!(!summary.results[2].is_failed());
    }

    #[tokio::test]
    async fn test_unparseable_record_is_isolated() {
        let (reactor, _) = reactor();
        let batch = StreamBatch {
            records: vec![json!("not a record"), insert("b")],
        };

        let summary = reactor.process_batch(&batch).await;

        assert_eq!(summary.successful_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert!(summary.results[0].is_failed());
    }

    #[tokio::test]
    async fn test_skipped_records_count_as_successful() {
        let (reactor, _) = reactor();
        let batch = StreamBatch {
            records: vec![json!({"eventName": "UNKNOWN"})],
        };

        let summary = reactor.process_batch(&batch).await;

        assert_eq!(summary.successful_count, 1);
        assert_eq!(summary.failed_count, 0);
        assert!(matches!(summary.results[0], RecordOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_batch_metrics() {
        let (reactor, sink) = reactor();
        let batch = StreamBatch {
            records: vec![insert("a"), malformed(), malformed(), insert("d")],
        };

        reactor.process_batch(&batch).await;

        assert_eq!(sink.named(metrics::PROCESSING_ERRORS).await.len(), 2);
        let processed = sink.named(metrics::RECORDS_PROCESSED).await;
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].value, 2.0);
        assert_eq!(sink.total(metrics::ITEMS_CREATED).await, 2.0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (reactor, sink) = reactor();
        let summary = reactor.process_batch(&StreamBatch::default()).await;

        assert_eq!(summary.total_records, 0);
        assert!(summary.results.is_empty());
        assert_eq!(sink.total(metrics::RECORDS_PROCESSED).await, 0.0);
    }

    #[tokio::test]
    async fn test_summary_serialization() {
        let (reactor, _) = reactor();
        let batch = StreamBatch {
            records: vec![insert("a"), malformed()],
        };

        let json = serde_json::to_value(reactor.process_batch(&batch).await).unwrap();

        assert_eq!(json["message"], "Processing complete");
        assert_eq!(json["total_records"], 2);
        assert_eq!(json["successful"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][0]["status"], "success");
        assert_eq!(json["results"][1]["status"], "failed");
    }
}
