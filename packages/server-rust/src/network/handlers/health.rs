//! Health, liveness, readiness, and upstream probe handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use futures_util::future::join_all;
use serde_json::{json, Map, Value};

use super::AppState;

/// Process identity plus the number of envelopes routed so far.
///
/// Always 200; `state` tells a draining gateway apart from a dead one.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let health = state.shutdown.health_state();

    Json(json!({
        "service": &*state.service_name,
        "status": if state.shutdown.is_ready() { "healthy" } else { "unavailable" },
        "state": health.as_str(),
        "messages_processed": state.history.total_recorded(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe; 200 while the process answers at all.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe; 503 while starting or draining.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Probes every collaborator's health endpoint concurrently.
///
/// Answers 200 when all are up, 503 otherwise, with per-service detail.
pub async fn upstreams_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let probes = state.upstreams.health_endpoints().into_iter().map(|(name, url)| {
        let client = &state.client;
        async move {
            let outcome = client.get_json(&url, &[]).await;
            (name, url, outcome)
        }
    });

    let mut all_up = true;
    let mut report = Map::new();
    for (name, url, outcome) in join_all(probes).await {
        let entry = match outcome {
            Ok(_) => json!({"url": url, "status": "up"}),
            Err(err) => {
                all_up = false;
                json!({"url": url, "status": "down", "error": err.to_string()})
            }
        };
        report.insert(name.to_string(), entry);
    }

    let status = if all_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if all_up { "healthy" } else { "degraded" },
            "upstreams": report,
        })),
    )
}
