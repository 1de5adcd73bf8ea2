//! Metric emission.
//!
//! The metrics backend is an external collaborator accepting
//! `(name, value, unit, dimensions)`. [`Metrics`] is the handle the rest of
//! the crate uses: it stamps the environment dimension and never lets a sink
//! failure reach the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

mod mock;
#[cfg(feature = "otel")]
mod otel;

pub use mock::MockMetricsSink;
#[cfg(feature = "otel")]
pub use otel::OtelMetricsSink;

/// Items created (reactor, INSERT of an `Item`).
pub const ITEMS_CREATED: &str = "ItemsCreated";
/// Items modified (reactor, MODIFY of an `Item`).
pub const ITEMS_MODIFIED: &str = "ItemsModified";
/// Items deleted (reactor, REMOVE of an `Item`).
pub const ITEMS_DELETED: &str = "ItemsDeleted";
/// Items moved to the inactive status.
pub const ITEMS_DEACTIVATED: &str = "ItemsDeactivated";
/// Records that failed inside the reactor.
pub const PROCESSING_ERRORS: &str = "ProcessingErrors";
/// Records processed successfully in one batch.
pub const RECORDS_PROCESSED: &str = "RecordsProcessed";

/// Dimension attached to every metric.
pub const ENVIRONMENT_DIMENSION: &str = "Environment";

/// Unit of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
}

impl MetricUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricUnit::Count => "Count",
        }
    }
}

/// A single metric observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub namespace: String,
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub dimensions: Vec<(String, String)>,
}

impl Metric {
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Metric sink errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Metric emission failed: {0}")]
    Emit(String),
}

/// Interface to the metrics backend.
///
/// Implementations:
/// - `LogMetricsSink`: writes observations to the log
/// - `OtelMetricsSink`: OpenTelemetry counters (feature `otel`)
/// - `MockMetricsSink`: records observations for tests
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric(&self, metric: Metric) -> Result<(), MetricsError>;
}

/// Sink that logs each observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn put_metric(&self, metric: Metric) -> Result<(), MetricsError> {
        info!(
            namespace = %metric.namespace,
            metric = %metric.name,
            value = metric.value,
            unit = metric.unit.as_str(),
            dimensions = ?metric.dimensions,
            "metric"
        );
        Ok(())
    }
}

/// Metrics sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSinkType {
    #[default]
    Log,
    Otel,
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Sink to send observations to.
    pub sink: MetricsSinkType,
    /// Namespace all metrics are published under.
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            sink: MetricsSinkType::Log,
            namespace: "ItemStream".to_string(),
        }
    }
}

/// Metrics handle: namespace + environment dimension over a sink.
#[derive(Clone)]
pub struct Metrics {
    sink: Arc<dyn MetricsSink>,
    namespace: String,
    environment: String,
}

impl Metrics {
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        namespace: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            namespace: namespace.into(),
            environment: environment.into(),
        }
    }

    /// Build from configuration.
    pub fn from_config(config: &MetricsConfig, environment: &str) -> Self {
        let sink: Arc<dyn MetricsSink> = match config.sink {
            MetricsSinkType::Log => Arc::new(LogMetricsSink),
            #[cfg(feature = "otel")]
            MetricsSinkType::Otel => Arc::new(OtelMetricsSink::new(&config.namespace)),
            #[cfg(not(feature = "otel"))]
            MetricsSinkType::Otel => {
                warn!("otel metrics requested but 'otel' feature is not enabled, logging instead");
                Arc::new(LogMetricsSink)
            }
        };
        Self::new(sink, config.namespace.clone(), environment)
    }

    /// Emit a count. Never fails.
    pub async fn count(&self, name: &str, value: u64) {
        self.record(name, value as f64, MetricUnit::Count).await;
    }

    /// Emit an observation. Sink failures are logged and dropped.
    pub async fn record(&self, name: &str, value: f64, unit: MetricUnit) {
        let metric = Metric {
            namespace: self.namespace.clone(),
            name: name.to_string(),
            value,
            unit,
            dimensions: vec![(
                ENVIRONMENT_DIMENSION.to_string(),
                self.environment.clone(),
            )],
        };

        match self.sink.put_metric(metric).await {
            Ok(()) => debug!(metric = %name, value, "Sent metric"),
            Err(e) => warn!(metric = %name, error = %e, "Failed to send metric"),
        }
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("namespace", &self.namespace)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
