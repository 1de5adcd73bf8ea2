//! OpenTelemetry metrics sink.
//!
//! Each metric name maps onto a lazily created `f64` counter named
//! `{namespace}.{name}`; dimensions become attributes. The OTel Collector /
//! Prometheus exporter converts dots to underscores.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::{global, KeyValue};

use super::{Metric, MetricsError, MetricsSink};

/// Instrumentation scope of the meter.
const METER_NAME: &str = "itemstream";

/// Sink publishing observations as OpenTelemetry counters.
pub struct OtelMetricsSink {
    meter: Meter,
    namespace: String,
    counters: Mutex<HashMap<String, Counter<f64>>>,
}

impl OtelMetricsSink {
    pub fn new(namespace: &str) -> Self {
        Self {
            meter: global::meter(METER_NAME),
            namespace: namespace.to_string(),
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn counter(&self, metric: &Metric) -> Result<Counter<f64>, MetricsError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|e| MetricsError::Emit(format!("counter registry poisoned: {e}")))?;

        let counter = counters
            .entry(metric.name.clone())
            .or_insert_with(|| {
                self.meter
                    .f64_counter(format!("{}.{}", self.namespace, metric.name))
                    .with_unit(metric.unit.as_str())
                    .build()
            })
            .clone();
        Ok(counter)
    }
}

#[async_trait]
impl MetricsSink for OtelMetricsSink {
    async fn put_metric(&self, metric: Metric) -> Result<(), MetricsError> {
        let counter = self.counter(&metric)?;
        let attributes: Vec<KeyValue> = metric
            .dimensions
            .iter()
            .map(|(name, value)| KeyValue::new(name.clone(), value.clone()))
            .collect();
        counter.add(metric.value, &attributes);
        Ok(())
    }
}
