//! Bootstrap utilities for itemstream binaries.
//!
//! Shared initialization code for the API server and the stream processor.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LEGACY_LOG_LEVEL_ENV_VAR, LOG_ENV_VAR, LOG_FORMAT_ENV_VAR};

/// Log filter from `ITEMSTREAM_LOG`, else the legacy `LOG_LEVEL`, else `info`.
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        let level = std::env::var(LEGACY_LOG_LEVEL_ENV_VAR)
            .ok()
            .and_then(|level| legacy_level(&level))
            .unwrap_or("info");
        EnvFilter::new(level)
    })
}

/// Map a legacy `LOG_LEVEL` name (`DEBUG`, `WARNING`, ...) to a level directive.
fn legacy_level(level: &str) -> Option<&'static str> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" | "WARNING" => Some("warn"),
        "ERROR" | "CRITICAL" | "FATAL" => Some("error"),
        _ => None,
    }
}

/// Whether `ITEMSTREAM_LOG_FORMAT` asks for JSON output.
pub fn json_logs() -> bool {
    std::env::var(LOG_FORMAT_ENV_VAR)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Initialize tracing.
///
/// Filter per [`log_filter`]; JSON lines when `ITEMSTREAM_LOG_FORMAT=json`.
pub fn init_tracing() {
    let registry = tracing_subscriber::registry().with(log_filter());
    if json_logs() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Install a global OTLP meter provider.
///
/// The exporter endpoint follows the standard `OTEL_EXPORTER_OTLP_*`
/// variables. Call `shutdown` on the returned provider before exit to flush.
#[cfg(feature = "otel")]
pub fn init_telemetry(
    default_service_name: &str,
) -> Result<opentelemetry_sdk::metrics::SdkMeterProvider, Box<dyn std::error::Error>> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
    use opentelemetry_sdk::{runtime, Resource};

    use crate::config::OTEL_SERVICE_NAME_ENV_VAR;

    let service_name = std::env::var(OTEL_SERVICE_NAME_ENV_VAR)
        .unwrap_or_else(|_| default_service_name.to_string());

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;
    let reader = PeriodicReader::builder(exporter, runtime::Tokio).build();
    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(Resource::new(vec![KeyValue::new("service.name", service_name.clone())]))
        .build();

    opentelemetry::global::set_meter_provider(provider.clone());
    tracing::info!(service = %service_name, "OpenTelemetry metrics enabled");
    Ok(provider)
}
