//! Generic envelope submission: `POST /esb/route`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use esb_core::InboundEnvelope;
use serde_json::json;
use tracing::debug;

use super::AppState;

/// Routes a caller-built envelope.
///
/// `status=success` results pass through with 200; `status=error` results
/// answer 400 with the whole result under `detail`. A body that is not a JSON
/// object never reaches the router and is not recorded.
pub async fn route_handler(
    State(state): State<AppState>,
    body: Result<Json<InboundEnvelope>, JsonRejection>,
) -> Response {
    let inbound = match body {
        Ok(Json(inbound)) => inbound,
        Err(rejection) => {
            debug!(error = %rejection, "undecodable envelope");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "detail": {"status": "error", "message": rejection.body_text()}
                })),
            )
                .into_response();
        }
    };

    let result = state.dispatch(inbound).await;
    if result.is_success() {
        (StatusCode::OK, Json(result)).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "detail": result }))).into_response()
    }
}
