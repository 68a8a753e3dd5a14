//! Recent routing history: `GET /esb/history?limit=N`.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::service::HistoryEntry;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    /// Entries currently retained.
    pub total_messages: usize,
    pub capacity: usize,
    /// Oldest first.
    pub recent_messages: Vec<HistoryEntry>,
}

/// Last `limit` entries (default 10), clamped to the buffer's capacity.
pub async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryView> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(HistoryView {
        total_messages: state.history.len(),
        capacity: state.history.capacity(),
        recent_messages: state.history.recent(limit),
    })
}
