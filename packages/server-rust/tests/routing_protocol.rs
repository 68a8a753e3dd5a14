//! End-to-end routing against HTTP stubs of the collaborator services.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use esb_core::{
    InboundEnvelope, Payload, RoutingStatus, RoutingTable, ServiceRegistry, Upstreams,
};
use esb_server::cli::{build_gateway, Cli};
use esb_server::{HttpServiceClient, MessageRouter, RouterConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn membership_envelope() -> InboundEnvelope {
    let mut payload = Payload::new();
    payload.insert("user_id".into(), json!(7));
    payload.insert("plan_type".into(), json!("gold"));
    payload.insert("payment_status".into(), json!("paid"));
    InboundEnvelope::new("frontend", "user-service", "membership.create", payload)
}

fn router_for(server: &MockServer) -> MessageRouter {
    let base = server.uri();
    let upstreams = Upstreams {
        users: base.clone(),
        memberships: base.clone(),
        catalog: base.clone(),
        providers: base,
    };
    let client = Arc::new(HttpServiceClient::new(Duration::from_secs(2)).unwrap());
    MessageRouter::new(
        Arc::new(ServiceRegistry::from_upstreams(&upstreams).unwrap()),
        Arc::new(RoutingTable::builtin()),
        client,
        &RouterConfig::default(),
    )
}

#[tokio::test]
async fn membership_create_validates_then_commits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/validate"))
        .and(body_json(json!({"user_id": 7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "message": "User exists",
            "user": {"user_id": 7, "name": "Ada", "email": "ada@example.com", "status": "active"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/memberships/internal/create"))
        .and(header_exists("Idempotency-Key"))
        .and(body_json(json!({"user_id": 7, "plan_type": "gold", "payment_status": "paid"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "membership_id": 42,
            "user_id": 7,
            "plan_type": "gold",
            "payment_status": "paid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = router_for(&server).route(&membership_envelope()).await;

    assert_eq!(result.status, RoutingStatus::Success, "{result:?}");
    assert_eq!(result.message, "Validation passed and callback completed");
    assert_eq!(result.result.as_ref().unwrap()["membership_id"], 42);
    assert_eq!(result.validation.as_ref().unwrap()["user"]["name"], "Ada");
}

#[tokio::test]
async fn membership_create_rejection_skips_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": false,
            "message": "User with id 7 does not exist"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/memberships/internal/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"membership_id": 1})))
        .expect(0)
        .mount(&server)
        .await;

    let result = router_for(&server).route(&membership_envelope()).await;

    assert_eq!(result.status, RoutingStatus::Error);
    assert!(result.message.contains("User with id 7 does not exist"));
    assert_eq!(
        result.validation.as_ref().unwrap()["message"],
        "User with id 7 does not exist"
    );
}

#[tokio::test]
async fn commit_failure_reports_callback_hop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/memberships/internal/create"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let result = router_for(&server).route(&membership_envelope()).await;

    assert_eq!(result.status, RoutingStatus::Error);
    assert_eq!(result.failed_hop.map(|h| h.as_str()), Some("callback"));
    assert_eq!(result.details.as_deref(), Some("database unavailable"));
    assert_eq!(result.validation, Some(json!({"valid": true})));
}

#[tokio::test]
async fn gateway_serves_routes_and_history_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/memberships/internal/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"membership_id": 42})))
        .mount(&server)
        .await;

    let base = server.uri();
    let cli = Cli::try_parse_from([
        "esb-server",
        "--host",
        "127.0.0.1",
        "--port",
        "0",
        "--users-url",
        &base,
        "--memberships-url",
        &base,
        "--catalog-url",
        &base,
        "--providers-url",
        &base,
    ])
    .unwrap();
    let mut gateway = build_gateway(cli.settings().unwrap()).unwrap();
    let port = gateway.start().await.unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let serving = tokio::spawn(gateway.serve(async move {
        let _ = stop_rx.await;
    }));

    let http = reqwest::Client::new();
    let url = |p: &str| format!("http://127.0.0.1:{port}{p}");

    let created = http
        .post(url("/api/memberships"))
        .json(&json!({"user_id": 7, "plan_type": "gold", "payment_status": "paid"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 200);
    let body: Value = created.json().await.unwrap();
    assert_eq!(body["result"]["membership_id"], 42);

    let rejected = http
        .post(url("/esb/route"))
        .json(&json!({"source": "frontend", "destination": "x", "message_type": "order.cancel", "payload": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 400);
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(
        body["detail"]["message"],
        "No routing rule found for message type: order.cancel"
    );

    let history: Value = http
        .get(url("/esb/history?limit=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["total_messages"], 2);
    assert_eq!(
        history["recent_messages"][0]["message"]["message_type"],
        "membership.create"
    );

    let health: Value = http
        .get(url("/esb/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["service"], "esb-core");
    assert_eq!(health["messages_processed"], 2);

    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
