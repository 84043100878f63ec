//! Tracing/logging initialization.
//!
//! JSON logs + timestamps, configurable via `RUST_LOG`, plus an
//! OpenTelemetry layer so span contexts can be carried through envelopes.
//! With the `otlp` feature the tracer exports over OTLP/gRPC
//! (`OTEL_EXPORTER_OTLP_ENDPOINT`, default `http://127.0.0.1:4317`);
//! otherwise spans stay process-local but remain propagatable.

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace as sdktrace;
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(service_name: &str) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let otel_layer = tracing_opentelemetry::layer().with_tracer(build_tracer(service_name));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init();
}

/// Flush and shut down the tracer provider (call at process exit).
pub fn shutdown() {
    global::shutdown_tracer_provider();
}

#[cfg(feature = "otlp")]
fn build_tracer(service_name: &str) -> sdktrace::Tracer {
    match install_otlp(service_name) {
        Ok(tracer) => tracer,
        Err(err) => {
            eprintln!("failed to initialise OTLP exporter ({err}); spans stay process-local");
            local_tracer(service_name)
        }
    }
}

#[cfg(not(feature = "otlp"))]
fn build_tracer(service_name: &str) -> sdktrace::Tracer {
    local_tracer(service_name)
}

/// Tracer with no exporter: spans are recorded (so contexts can be injected
/// into envelopes) but never leave the process.
fn local_tracer(service_name: &str) -> sdktrace::Tracer {
    let provider = sdktrace::TracerProvider::builder()
        .with_config(sdktrace::Config::default().with_resource(service_resource(service_name)))
        .build();
    let tracer = provider.tracer("farestream");
    global::set_tracer_provider(provider);
    tracer
}

#[cfg(feature = "otlp")]
fn install_otlp(
    service_name: &str,
) -> Result<sdktrace::Tracer, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry_otlp::WithExportConfig;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://127.0.0.1:4317".to_string());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(
            sdktrace::Config::default().with_resource(service_resource(service_name)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    Ok(tracer)
}

fn service_resource(service_name: &str) -> Resource {
    Resource::new(vec![opentelemetry::KeyValue::new(
        "service.name",
        service_name.to_string(),
    )])
}
