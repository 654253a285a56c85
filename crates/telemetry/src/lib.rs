//! Telemetry for the gateway
//!
//! Provides OpenTelemetry metrics export and the in-process per-tool statistics served by the
//! metrics endpoint.

pub mod metrics;

use config::TelemetryConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;

pub use metrics::{ToolCallStats, ToolStatsSnapshot};
pub use opentelemetry::KeyValue;

/// Guard that ensures proper cleanup of telemetry resources
pub struct TelemetryGuard {
    meter_provider: SdkMeterProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.meter_provider.shutdown() {
            log::error!("Failed to shutdown meter provider: {e}");
        }
    }
}

/// Initialize telemetry with the given configuration
///
/// Returns a guard that should be kept alive for the duration of the application.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    let meter_provider = metrics::init_metrics(config)?;

    Ok(TelemetryGuard { meter_provider })
}
