//! itemstream-processor: change-feed batch reactor
//!
//! Reads one delivered batch (`{"Records": [...]}`) from the file given as
//! the first argument, or from stdin, runs it through the reactor and
//! prints the summary as JSON.
//!
//! ## Configuration
//! - ITEMSTREAM_CONFIG: YAML config file (optional)
//! - ENVIRONMENT: environment dimension of emitted metrics
//! - ITEMSTREAM__METRICS__SINK: `log` (default) or `otel`
//! - ITEMSTREAM_LOG / LOG_LEVEL: log filter

use std::io::Read;
use std::sync::Arc;

use tracing::info;

use itemstream::config::Config;
use itemstream::metrics::{Metrics, MetricsSinkType};
use itemstream::store::EntityType;
use itemstream::stream::{
    BatchReactor, Dispatcher, HandlerRegistry, ItemHandler, LogNotifier, StreamBatch,
};
use itemstream::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;

    #[cfg(feature = "otel")]
    let meter_provider = match config.metrics.sink {
        MetricsSinkType::Otel => Some(itemstream::utils::bootstrap::init_telemetry(
            "itemstream-processor",
        )?),
        MetricsSinkType::Log => None,
    };
    #[cfg(not(feature = "otel"))]
    if config.metrics.sink == MetricsSinkType::Otel {
        tracing::warn!("otel metrics requested but 'otel' feature is not enabled");
    }

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
    };
    let batch: StreamBatch = serde_json::from_str(&raw)?;

    let metrics = Metrics::from_config(&config.metrics, &config.environment);
    let handler = Arc::new(ItemHandler::new(metrics.clone(), Arc::new(LogNotifier)));
    let registry = HandlerRegistry::new().register(EntityType::Item, handler);
    let reactor = BatchReactor::new(Dispatcher::new(registry), metrics);

    info!(records = batch.len(), environment = %config.environment, "itemstream-processor started");
    let summary = reactor.process_batch(&batch).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    #[cfg(feature = "otel")]
    if let Some(provider) = meter_provider {
        provider.shutdown()?;
    }

    Ok(())
}
