//! Frontend convenience endpoints under `/api`.
//!
//! Writes wrap a flat payload into a canonical envelope and go through the
//! router like any other message. Reads bypass the router and proxy the
//! collaborator's list or item endpoint, reshaped into typed wrappers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use esb_core::{
    join_url, message_types, service_names, ApiListResponse, ApiResponse, CatalogService,
    InboundEnvelope, Membership, Payload, Provider, RoutingResult, Upstreams, User,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::AppState;
use crate::traits::HopError;

const FRONTEND_SOURCE: &str = "frontend";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a convenience endpoint, rendered as `{"detail": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body was not a JSON object.
    #[error("{0}")]
    BadRequest(String),
    /// The router answered `status=error`.
    #[error("{}", .0.message)]
    Rejected(RoutingResult),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },
    /// Upstream failure other than 404.
    #[error("upstream request failed: {0}")]
    Upstream(HopError),
    /// Upstream answered 2xx with a body that does not match the record shape.
    #[error("unexpected response from {endpoint}: {reason}")]
    Shape { endpoint: String, reason: String },
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Shape { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// The four collaborator collections the frontend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Users,
    Memberships,
    Services,
    Providers,
}

impl Resource {
    fn label(self) -> &'static str {
        match self {
            Resource::Users => "user",
            Resource::Memberships => "membership",
            Resource::Services => "service",
            Resource::Providers => "provider",
        }
    }

    fn message_type(self) -> &'static str {
        match self {
            Resource::Users => message_types::USER_CREATE,
            Resource::Memberships => message_types::MEMBERSHIP_CREATE,
            Resource::Services => message_types::SERVICE_CREATE,
            Resource::Providers => message_types::PROVIDER_CREATE,
        }
    }

    /// Advisory `destination` stamped on convenience envelopes.
    fn destination(self) -> &'static str {
        match self {
            Resource::Users | Resource::Memberships => service_names::USER_SERVICE,
            Resource::Services => service_names::CATALOG_SERVICE,
            Resource::Providers => service_names::PROVIDER_SERVICE,
        }
    }

    fn collection_url(self, upstreams: &Upstreams) -> String {
        match self {
            Resource::Users => join_url(&upstreams.users, "/users/"),
            Resource::Memberships => join_url(&upstreams.memberships, "/memberships/"),
            Resource::Services => join_url(&upstreams.catalog, "/services/"),
            Resource::Providers => join_url(&upstreams.providers, "/providers/"),
        }
    }

    fn item_url(self, upstreams: &Upstreams, id: i64) -> String {
        format!("{}{id}", self.collection_url(upstreams))
    }
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Paging window passed straight through to the collaborator.
#[derive(Debug, Default, Deserialize)]
pub struct ListWindow {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl ListWindow {
    fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(skip) = self.skip {
            query.push(("skip".to_string(), skip.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

async fn submit(
    state: &AppState,
    resource: Resource,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    let Json(payload) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let inbound = InboundEnvelope::new(
        FRONTEND_SOURCE,
        resource.destination(),
        resource.message_type(),
        payload,
    );

    let result = state.dispatch(inbound).await;
    if result.is_success() {
        Ok(Json(result))
    } else {
        Err(ApiError::Rejected(result))
    }
}

async fn fetch_list<T: DeserializeOwned>(
    state: &AppState,
    resource: Resource,
    window: ListWindow,
) -> Result<Json<ApiListResponse<T>>, ApiError> {
    let endpoint = resource.collection_url(&state.upstreams);
    let body = state
        .client
        .get_json(&endpoint, &window.query())
        .await
        .map_err(|err| {
            warn!(endpoint = %endpoint, error = %err, "list proxy failed");
            ApiError::Upstream(err)
        })?;

    let records: Vec<T> = decode(&endpoint, body)?;
    Ok(Json(
        ApiListResponse::success(records).with_window(window.skip, window.limit),
    ))
}

async fn fetch_one<T: DeserializeOwned>(
    state: &AppState,
    resource: Resource,
    id: i64,
) -> Result<Json<ApiResponse<T>>, ApiError> {
    let endpoint = resource.item_url(&state.upstreams, id);
    let body = state
        .client
        .get_json(&endpoint, &[])
        .await
        .map_err(|err| match err.status() {
            Some(404) => ApiError::NotFound {
                resource: resource.label(),
                id,
            },
            _ => {
                warn!(endpoint = %endpoint, error = %err, "item proxy failed");
                ApiError::Upstream(err)
            }
        })?;

    Ok(Json(ApiResponse::success(decode(&endpoint, body)?)))
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Shape {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    submit(&state, Resource::Users, body).await
}

/// Runs the validate/commit protocol: the user must exist before the
/// membership is created.
pub async fn create_membership(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    submit(&state, Resource::Memberships, body).await
}

pub async fn create_service(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    submit(&state, Resource::Services, body).await
}

pub async fn create_provider(
    State(state): State<AppState>,
    body: Result<Json<Payload>, JsonRejection>,
) -> Result<Json<RoutingResult>, ApiError> {
    submit(&state, Resource::Providers, body).await
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(window): Query<ListWindow>,
) -> Result<Json<ApiListResponse<User>>, ApiError> {
    fetch_list(&state, Resource::Users, window).await
}

pub async fn list_memberships(
    State(state): State<AppState>,
    Query(window): Query<ListWindow>,
) -> Result<Json<ApiListResponse<Membership>>, ApiError> {
    fetch_list(&state, Resource::Memberships, window).await
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(window): Query<ListWindow>,
) -> Result<Json<ApiListResponse<CatalogService>>, ApiError> {
    fetch_list(&state, Resource::Services, window).await
}

pub async fn list_providers(
    State(state): State<AppState>,
    Query(window): Query<ListWindow>,
) -> Result<Json<ApiListResponse<Provider>>, ApiError> {
    fetch_list(&state, Resource::Providers, window).await
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    fetch_one(&state, Resource::Users, id).await
}

pub async fn get_membership(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Membership>>, ApiError> {
    fetch_one(&state, Resource::Memberships, id).await
}

pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CatalogService>>, ApiError> {
    fetch_one(&state, Resource::Services, id).await
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Provider>>, ApiError> {
    fetch_one(&state, Resource::Providers, id).await
}
