//! Recording metrics sink for tests.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Metric, MetricsError, MetricsSink};

/// Sink that keeps every observation in memory.
#[derive(Default)]
pub struct MockMetricsSink {
    metrics: RwLock<Vec<Metric>>,
    fail: RwLock<bool>,
}

impl MockMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every emission fail.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn metrics(&self) -> Vec<Metric> {
        self.metrics.read().await.clone()
    }

    /// Observations recorded under `name`.
    pub async fn named(&self, name: &str) -> Vec<Metric> {
        self.metrics
            .read()
            .await
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    /// Sum of values recorded under `name`.
    pub async fn total(&self, name: &str) -> f64 {
        self.named(name).await.iter().map(|m| m.value).sum()
    }
}

#[async_trait]
impl MetricsSink for MockMetricsSink {
    async fn put_metric(&self, metric: Metric) -> Result<(), MetricsError> {
        if *self.fail.read().await {
            return Err(MetricsError::Emit("injected failure".to_string()));
        }
        self.metrics.write().await.push(metric);
        Ok(())
    }
}
