//! HTTP handler definitions for the gateway.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports every handler for router assembly.

pub mod api;
pub mod health;
pub mod history;
pub mod route;
pub mod services;

pub use api::{
    create_membership, create_provider, create_service, create_user, get_membership,
    get_provider, get_service, get_user, list_memberships, list_providers, list_services,
    list_users, ApiError,
};
pub use health::{health_handler, liveness_handler, readiness_handler, upstreams_handler};
pub use history::history_handler;
pub use route::route_handler;
pub use services::services_handler;

use std::sync::Arc;
use std::time::Instant;

use esb_core::{InboundEnvelope, RoutingResult, Upstreams};
use tracing::{error, Instrument};

use super::ShutdownController;
use crate::service::{HistoryBuffer, MessageRouter};
use crate::traits::ServiceClient;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Every field is behind `Arc` (or `Copy`), so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Routes envelopes; read-only after startup.
    pub router: Arc<MessageRouter>,
    /// Recent envelopes and their results.
    pub history: Arc<HistoryBuffer>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Client used by the direct read proxies and the upstream probe.
    pub client: Arc<dyn ServiceClient>,
    /// Collaborator base URLs for the direct read proxies.
    pub upstreams: Arc<Upstreams>,
    /// Process identity reported by `/esb/health`.
    pub service_name: Arc<str>,
    /// Process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Routes one envelope and records it, with its result, in history.
    ///
    /// The route runs on its own task, so a dropped request (client abort or
    /// request timeout) neither cancels a hop mid-protocol nor skips the
    /// history record. It counts as in flight until that task finishes.
    pub async fn dispatch(&self, inbound: InboundEnvelope) -> RoutingResult {
        let guard = self.shutdown.in_flight_guard();
        let router = Arc::clone(&self.router);
        let history = Arc::clone(&self.history);

        let task = tokio::spawn(
            async move {
                let _guard = guard;
                let result = router.route(&inbound).await;
                history.record(inbound, result.clone());
                result
            }
            .in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "route task failed");
                RoutingResult::error("Internal routing failure")
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_state {
    use std::sync::Arc;
    use std::time::Instant;

    use esb_core::{RoutingTable, ServiceRegistry, Upstreams};

    use super::AppState;
    use crate::network::ShutdownController;
    use crate::service::{HistoryBuffer, MessageRouter, RouterConfig};
    use crate::test_support::RecordingClient;

    /// Gateway state over the default registry and table, backed by `client`.
    pub fn with_client(client: Arc<RecordingClient>) -> AppState {
        let upstreams = Upstreams::default();
        let registry = ServiceRegistry::from_upstreams(&upstreams).unwrap();
        let router = MessageRouter::new(
            Arc::new(registry),
            Arc::new(RoutingTable::builtin()),
            client.clone(),
            &RouterConfig::default(),
        );
        let shutdown = Arc::new(ShutdownController::new());
        shutdown.set_ready();
        AppState {
            router: Arc::new(router),
            history: Arc::new(HistoryBuffer::new(100)),
            shutdown,
            client,
            upstreams: Arc::new(upstreams),
            service_name: Arc::from("esb-core"),
            start_time: Instant::now(),
        }
    }
}
