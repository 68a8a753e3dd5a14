//! Route and hop instrumentation.
//!
//! Counters and histograms go through the `metrics` facade; without an
//! installed recorder they are no-ops. Span fields carry the same values for
//! log-based inspection.

use std::time::Duration;

use esb_core::{HopStage, RoutingResult, RoutingTable};

pub const ROUTES_TOTAL: &str = "esb_routes_total";
pub const ROUTE_DURATION_SECONDS: &str = "esb_route_duration_seconds";
pub const HOPS_TOTAL: &str = "esb_hops_total";

/// Label for a message type the routing table does not know.
pub const UNKNOWN_TYPE_LABEL: &str = "unknown";
/// Label for an envelope without a string `message_type`.
pub const MALFORMED_LABEL: &str = "<malformed>";

/// Metric label for a caller-supplied message type.
///
/// Only types present in the table pass through, so the label set stays
/// bounded by the table size no matter what callers send.
pub fn message_type_label<'a>(table: &RoutingTable, message_type: Option<&'a str>) -> &'a str {
    match message_type {
        Some(t) if table.get(t).is_some() => t,
        Some(_) => UNKNOWN_TYPE_LABEL,
        None => MALFORMED_LABEL,
    }
}

/// Records the outcome of one `route` call on the current span and in metrics.
///
/// `message_type` must already be bounded; see [`message_type_label`].
pub fn record_route(message_type: &str, result: &RoutingResult, elapsed: Duration) {
    let status = result.status.as_str();

    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = elapsed.as_millis() as u64;
    let span = tracing::Span::current();
    span.record("outcome", status);
    span.record("duration_ms", duration_ms);

    metrics::counter!(
        ROUTES_TOTAL,
        "message_type" => message_type.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(ROUTE_DURATION_SECONDS, "status" => status).record(elapsed.as_secs_f64());

    tracing::info!(outcome = status, duration_ms, "route complete");
}

/// Counts one outbound hop by stage and outcome.
pub fn record_hop(stage: HopStage, ok: bool) {
    metrics::counter!(
        HOPS_TOTAL,
        "stage" => stage.as_str(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}
