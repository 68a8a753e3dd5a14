//! Static configuration introspection: `GET /esb/services`.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;

/// The service registry and routing table the gateway was started with.
pub async fn services_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "services": state.router.registry(),
        "routing_rules": state.router.table(),
    }))
}
