//! Metrics initialization and management

mod names;
mod recorder;
mod tool_stats;

pub use names::*;
pub use recorder::Recorder;
pub use tool_stats::{ToolCallStats, ToolStatsSnapshot};

use anyhow::Context;
use config::{OtlpProtocol, TelemetryConfig};
use opentelemetry::metrics::Meter;
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
};

const METER_NAME: &str = "dealpath-mcp";

/// Get the global meter for recording metrics
pub fn meter() -> Meter {
    opentelemetry::global::meter(METER_NAME)
}

pub(crate) fn init_metrics(config: &TelemetryConfig) -> anyhow::Result<SdkMeterProvider> {
    let meter_provider = create_meter_provider(config)?;

    opentelemetry::global::set_meter_provider(meter_provider.clone());

    log::debug!(
        "Telemetry metrics initialized for service '{}'",
        config.service_name().unwrap_or(METER_NAME)
    );

    Ok(meter_provider)
}

fn create_meter_provider(config: &TelemetryConfig) -> anyhow::Result<SdkMeterProvider> {
    let Some(exporter_config) = config.metrics_otlp_config() else {
        log::debug!("No metrics exporter enabled, metrics are only kept in-process");
        return Ok(SdkMeterProvider::builder().build());
    };

    let mut builder = Resource::builder().with_service_name(config.service_name().unwrap_or(METER_NAME).to_string());

    for (key, value) in config.resource_attributes() {
        builder = builder.with_attribute(opentelemetry::KeyValue::new(key.clone(), value.clone()));
    }

    let exporter = match exporter_config.protocol {
        OtlpProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(exporter_config.endpoint.as_str())
            .with_timeout(exporter_config.timeout)
            .build()
            .context("Failed to create gRPC OTLP metric exporter")?,
        OtlpProtocol::Http => MetricExporter::builder()
            .with_http()
            .with_endpoint(exporter_config.endpoint.as_str())
            .with_timeout(exporter_config.timeout)
            .build()
            .context("Failed to create HTTP OTLP metric exporter")?,
    };

    let reader = PeriodicReader::builder(exporter)
        .with_interval(exporter_config.interval)
        .build();

    let provider = SdkMeterProvider::builder()
        .with_resource(builder.build())
        .with_reader(reader)
        .build();

    log::info!(
        "OTLP metrics exporter initialized to {} via {:?}",
        exporter_config.endpoint,
        exporter_config.protocol
    );

    Ok(provider)
}
