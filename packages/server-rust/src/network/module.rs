//! Gateway module with deferred startup lifecycle.
//!
//! `new()` assembles shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections. Between `start()` and `serve()` the caller
//! knows the bound port but no request has been accepted yet.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use esb_core::Upstreams;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    create_membership, create_provider, create_service, create_user, get_membership,
    get_provider, get_service, get_user, health_handler, history_handler, list_memberships,
    list_providers, list_services, list_users, liveness_handler, readiness_handler,
    route_handler, services_handler, upstreams_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::{HistoryBuffer, MessageRouter};
use crate::traits::ServiceClient;

/// Owns the gateway's listener and shared state.
///
/// 1. `new()` -- wires router, history, and client into `AppState`
/// 2. `start()` -- binds the configured address
/// 3. `serve()` -- serves until the shutdown future resolves, then drains
pub struct GatewayModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl GatewayModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        router: Arc<MessageRouter>,
        history: Arc<HistoryBuffer>,
        client: Arc<dyn ServiceClient>,
        upstreams: Upstreams,
        service_name: &str,
    ) -> Self {
        let state = AppState {
            router,
            history,
            shutdown: Arc::new(ShutdownController::new()),
            client,
            upstreams: Arc::new(upstreams),
            service_name: Arc::from(service_name),
            start_time: Instant::now(),
        };
        Self {
            config,
            listener: None,
            state,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryBuffer> {
        Arc::clone(&self.state.history)
    }

    /// Assembles the axum router with every route and the HTTP layers.
    ///
    /// - `POST /esb/route` -- generic envelope submission
    /// - `GET /esb/health`, `/esb/health/live`, `/esb/health/ready`, `/esb/health/upstreams`
    /// - `GET /esb/history?limit=N`
    /// - `GET /esb/services`
    /// - `GET|POST /api/{users,memberships,services,providers}`, `GET /api/{kind}/{id}`
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/esb/route", post(route_handler))
            .route("/esb/health", get(health_handler))
            .route("/esb/health/live", get(liveness_handler))
            .route("/esb/health/ready", get(readiness_handler))
            .route("/esb/health/upstreams", get(upstreams_handler))
            .route("/esb/history", get(history_handler))
            .route("/esb/services", get(services_handler))
            .route("/api/users", get(list_users).post(create_user))
            .route("/api/users/{id}", get(get_user))
            .route(
                "/api/memberships",
                get(list_memberships).post(create_membership),
            )
            .route("/api/memberships/{id}", get(get_membership))
            .route("/api/services", get(list_services).post(create_service))
            .route("/api/services/{id}", get(get_service))
            .route("/api/providers", get(list_providers).post(create_provider))
            .route("/api/providers/{id}", get(get_provider))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener and returns the bound port (OS-assigned when
    /// the configured port is 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains.
    ///
    /// Once `shutdown` resolves the gateway reports `Draining` and stops
    /// accepting connections. Open connections and in-flight routes then
    /// share one `drain_timeout` budget.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let router = self.build_router();
        let controller = Arc::clone(&self.state.shutdown);

        let drain_timeout = self.config.drain_timeout;

        let (drain_tx, mut drain_rx) = oneshot::channel();
        let draining = Arc::clone(&controller);
        let graceful = async move {
            shutdown.await;
            draining.trigger_shutdown();
            info!("Shutdown requested, draining");
            let _ = drain_tx.send(tokio::time::Instant::now());
        };

        controller.set_ready();
        info!("Serving HTTP connections");

        let serving = axum::serve(listener, router)
            .with_graceful_shutdown(graceful)
            .into_future();
        tokio::pin!(serving);

        let deadline = tokio::select! {
            res = &mut serving => {
                res?;
                tokio::time::Instant::now() + drain_timeout
            }
            Ok(started) = &mut drain_rx => {
                let deadline = started + drain_timeout;
                match tokio::time::timeout_at(deadline, &mut serving).await {
                    Ok(res) => res?,
                    Err(_) => warn!("Drain timeout expired with connections still open"),
                }
                deadline
            }
        };

        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if controller.wait_for_drain(remaining).await {
            info!("All in-flight routes drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "Drain timeout expired with routes still in flight"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use esb_core::{RoutingTable, ServiceRegistry};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::network::HealthState;
    use crate::service::RouterConfig;
    use crate::test_support::RecordingClient;

    const USERS: &str = "http://users_service:8002/users/";

    fn module_with(client: Arc<RecordingClient>, drain_timeout: Duration) -> GatewayModule {
        let upstreams = Upstreams::default();
        let client: Arc<dyn ServiceClient> = client;
        let router = MessageRouter::new(
            Arc::new(ServiceRegistry::from_upstreams(&upstreams).unwrap()),
            Arc::new(RoutingTable::builtin()),
            Arc::clone(&client),
            &RouterConfig::default(),
        );
        GatewayModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                drain_timeout,
                ..NetworkConfig::default()
            },
            Arc::new(router),
            Arc::new(HistoryBuffer::new(100)),
            client,
            upstreams,
            "esb-core",
        )
    }

    fn module() -> GatewayModule {
        module_with(Arc::new(RecordingClient::new()), Duration::from_secs(30))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..400 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached within 2s");
    }

    /// Serves `module` until the returned sender fires, with one slow
    /// `POST /api/users` already in flight.
    async fn serve_with_slow_request(
        mut module: GatewayModule,
    ) -> (
        Arc<ShutdownController>,
        oneshot::Sender<()>,
        tokio::task::JoinHandle<anyhow::Result<()>>,
        tokio::task::JoinHandle<reqwest::Result<reqwest::Response>>,
    ) {
        let port = module.start().await.unwrap();
        let controller = module.shutdown_controller();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(module.serve(async move {
            let _ = stop_rx.await;
        }));

        let request = tokio::spawn(async move {
            reqwest::Client::new()
                .post(format!("http://127.0.0.1:{port}/api/users"))
                .json(&json!({"name": "Ada"}))
                .send()
                .await
        });
        wait_until(|| controller.in_flight_count() == 1).await;
        (controller, stop_tx, serving, request)
    }

    #[test]
    fn new_does_not_bind() {
        let module = module();
        assert!(module.listener.is_none());
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
    }

    #[tokio::test]
    async fn router_serves_routed_paths() {
        let module = module();
        module.shutdown_controller().set_ready();
        let router = module.build_router();

        for path in ["/esb/health", "/esb/health/live", "/esb/history", "/esb/services"] {
            let response = router
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }

        let missing = router
            .oneshot(Request::get("/esb/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_binds_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_drains_and_stops() {
        let mut module = module();
        module.start().await.unwrap();
        let controller = module.shutdown_controller();

        module.serve(async {}).await.unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn reports_draining_while_open_requests_finish() {
        let client = Arc::new(
            RecordingClient::new()
                .respond(USERS, json!({"user_id": 1}))
                .with_delay(Duration::from_millis(300)),
        );
        let module = module_with(client, Duration::from_secs(5));
        let (controller, stop_tx, serving, request) = serve_with_slow_request(module).await;

        stop_tx.send(()).unwrap();
        wait_until(|| controller.health_state() == HealthState::Draining).await;
        assert!(!controller.is_ready());
        assert!(!serving.is_finished());

        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), 200);
        serving.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn drain_timeout_bounds_shutdown() {
        let client = Arc::new(
            RecordingClient::new()
                .respond(USERS, json!({"user_id": 1}))
                .with_delay(Duration::from_secs(10)),
        );
        let module = module_with(client, Duration::from_millis(100));
        let (controller, stop_tx, serving, _request) = serve_with_slow_request(module).await;

        stop_tx.send(()).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(3), serving).await;
        finished.expect("serve outlived the drain timeout").unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Draining);
        assert_eq!(controller.in_flight_count(), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let _ = module().serve(std::future::pending::<()>()).await;
    }
}
