//! OpenTelemetry export
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP gRPC endpoint (e.g., http://localhost:4317)
//! - `OTEL_SERVICE_NAME`: Service name (default: linkrelay-server)
//!
//! ```text
//! OTEL_EXPORTER_OTLP_ENDPOINT=http://localhost:4317 \
//!     ./linkrelay-server
//! ```

use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[cfg(feature = "telemetry")]
const DEFAULT_SERVICE_NAME: &str = "linkrelay-server";

/// What happened to telemetry; logged once the subscriber is up
#[allow(dead_code)]
pub enum TelemetryStatus {
    NotConfigured,
    Enabled { endpoint: String },
    FeatureDisabled,
}

impl TelemetryStatus {
    pub fn log(&self) {
        match self {
            TelemetryStatus::NotConfigured => {
                tracing::debug!("OpenTelemetry not configured (OTEL_EXPORTER_OTLP_ENDPOINT not set)");
            }
            TelemetryStatus::Enabled { endpoint } => {
                tracing::info!(endpoint = %endpoint, "OpenTelemetry export enabled");
            }
            TelemetryStatus::FeatureDisabled => {
                tracing::warn!("OpenTelemetry endpoint set but feature 'telemetry' not enabled");
                tracing::warn!("Rebuild with: cargo build --features telemetry");
            }
        }
    }
}

/// Tracing layer exporting spans, when an endpoint is configured
pub fn layer() -> Result<(Option<BoxedLayer>, TelemetryStatus)> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok((None, TelemetryStatus::NotConfigured));
    };

    #[cfg(feature = "telemetry")]
    {
        let layer = otlp_layer(&endpoint)?;
        Ok((Some(layer), TelemetryStatus::Enabled { endpoint }))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        let _ = endpoint;
        Ok((None, TelemetryStatus::FeatureDisabled))
    }
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

