//! W3C trace-context carriers for envelopes.
//!
//! Propagation is best-effort: a malformed or absent carrier leaves the
//! consuming span on its ambient parent and never aborts processing.

use std::collections::HashMap;

use opentelemetry::global;
use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Capture the current span's context as a carrier map
/// (`traceparent`/`tracestate`), suitable for embedding in an envelope.
///
/// Empty when there is no active, sampled span.
pub fn inject_context() -> HashMap<String, String> {
    let mut carrier = HashMap::new();
    let cx = Span::current().context();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&cx, &mut carrier));
    carrier
}

/// Continue a trace carried in an envelope: set `span`'s parent from the
/// carrier iff it holds a valid context, otherwise leave the span untouched.
pub fn continue_trace(span: &Span, carrier: Option<&HashMap<String, String>>) {
    let Some(carrier) = carrier else {
        return;
    };
    let cx = global::get_text_map_propagator(|propagator| propagator.extract(carrier));
    if cx.span().span_context().is_valid() {
        span.set_parent(cx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    #[test]
    fn malformed_carriers_are_ignored() {
        let span = tracing::info_span!("consume");
        let mut carrier = HashMap::new();
        carrier.insert("traceparent".to_string(), "definitely-not-w3c".to_string());

        // Must not panic or fail; the span keeps its ambient parent.
        continue_trace(&span, Some(&carrier));
        continue_trace(&span, None);
    }

    #[test]
    fn valid_traceparent_extracts_a_valid_context() {
        let propagator = TraceContextPropagator::new();
        let mut carrier = HashMap::new();
        carrier.insert(
            "traceparent".to_string(),
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
        );

        let cx = propagator.extract(&carrier);
        assert!(cx.span().span_context().is_valid());
    }

    #[test]
    fn inject_without_active_span_yields_no_carrier_entries() {
        // No subscriber/span in this test: injection is a silent no-op.
        assert!(inject_context().is_empty());
    }
}
