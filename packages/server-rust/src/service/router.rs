//! Message routing: validates, enriches, looks up the policy for the message
//! type, and runs either the single-hop or the two-step validate/commit
//! protocol against collaborator services.
//!
//! The two-step protocol is a saga without compensation:
//! `VALIDATE -> (reject | COMMIT)`. A negative verdict never reaches the
//! callback service. A failed commit is reported, but the completed
//! validation hop is not undone; validation is side-effect free.

use std::sync::Arc;
use std::time::Instant;

use esb_core::{
    ClockSource, EnrichedEnvelope, EnvelopeMetadata, HopStage, InboundEnvelope, RoutingPolicy,
    RoutingResult, RoutingTable, ServiceRegistry, SystemClock, ValidationVerdict,
};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};

use super::config::RouterConfig;
use super::error::RouteError;
use super::metrics::{message_type_label, record_hop, record_route};
use crate::traits::{HopError, ServiceClient};

// ---------------------------------------------------------------------------
// MessageRouter
// ---------------------------------------------------------------------------

/// Routes envelopes according to a fixed routing table.
///
/// Holds only read-only collaborators behind `Arc`, so one router is shared
/// by every request handler and concurrent calls never coordinate.
pub struct MessageRouter {
    registry: Arc<ServiceRegistry>,
    table: Arc<RoutingTable>,
    client: Arc<dyn ServiceClient>,
    clock: Arc<dyn ClockSource>,
    esb_version: String,
}

impl MessageRouter {
    /// Creates a router stamping envelopes with the system clock.
    #[must_use]
    pub fn new(
        registry: Arc<ServiceRegistry>,
        table: Arc<RoutingTable>,
        client: Arc<dyn ServiceClient>,
        config: &RouterConfig,
    ) -> Self {
        Self {
            registry,
            table,
            client,
            clock: Arc::new(SystemClock),
            esb_version: config.esb_version.clone(),
        }
    }

    /// Replaces the clock used for `esb_timestamp`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Routes one envelope. Never fails: every error becomes a
    /// `status=error` result.
    ///
    /// The caller's envelope is only borrowed; enrichment works on a copy.
    pub async fn route(&self, inbound: &InboundEnvelope) -> RoutingResult {
        let hint = inbound.message_type_hint();
        let span = info_span!(
            "route",
            message_type = hint.unwrap_or("<missing>"),
            message_id = tracing::field::Empty,
            outcome = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = self.route_inner(inbound).await;
            let label = message_type_label(&self.table, hint);
            record_route(label, &result, start.elapsed());
            result
        }
        .instrument(span)
        .await
    }

    async fn route_inner(&self, inbound: &InboundEnvelope) -> RoutingResult {
        let envelope = match inbound.validate() {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "rejected malformed envelope");
                return RouteError::from(err).into();
            }
        };

        let enriched = envelope.enrich(EnvelopeMetadata::stamp(
            self.clock.as_ref(),
            &self.esb_version,
        ));
        let message_id = enriched.metadata.esb_message_id.clone();
        tracing::Span::current().record("message_id", message_id.as_str());

        let result = match self.dispatch(&enriched).await {
            Ok(result) => result,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "routing failed");
                err.into()
            }
        };
        result.with_message_id(message_id)
    }

    async fn dispatch(&self, enriched: &EnrichedEnvelope) -> Result<RoutingResult, RouteError> {
        let message_type = &enriched.envelope.message_type;
        let policy = self
            .table
            .get(message_type)
            .ok_or_else(|| RouteError::UnknownMessageType {
                message_type: message_type.clone(),
            })?;

        if policy.validation_required {
            self.route_with_validation(enriched, policy).await
        } else {
            self.route_simple(enriched, policy).await
        }
    }

    /// Single hop: transform, deliver, return the remote body verbatim.
    async fn route_simple(
        &self,
        enriched: &EnrichedEnvelope,
        policy: &RoutingPolicy,
    ) -> Result<RoutingResult, RouteError> {
        let service = policy.destination_service.as_str();
        let payload = Value::Object(policy.transformer.apply(&enriched.envelope.payload));
        let endpoint = self.resolve(HopStage::Delivery, service)?;

        let response = self
            .hop(
                HopStage::Delivery,
                service,
                endpoint,
                &payload,
                Some(&enriched.metadata.esb_message_id),
            )
            .await
            .map_err(|source| RouteError::Hop {
                stage: HopStage::Delivery,
                service: service.to_string(),
                source,
                verdict: None,
            })?;

        Ok(RoutingResult::success("Message routed successfully")
            .with_destination(service)
            .with_response(response))
    }

    /// Two hops: validate with the transformed payload, then commit the
    /// original payload only on a positive verdict.
    async fn route_with_validation(
        &self,
        enriched: &EnrichedEnvelope,
        policy: &RoutingPolicy,
    ) -> Result<RoutingResult, RouteError> {
        let validation_service = policy.destination_service.as_str();
        let validation_payload =
            Value::Object(policy.transformer.apply(&enriched.envelope.payload));
        let endpoint = self.resolve(HopStage::Validation, validation_service)?;

        let verdict_body = self
            .hop(
                HopStage::Validation,
                validation_service,
                endpoint,
                &validation_payload,
                None,
            )
            .await
            .map_err(|source| RouteError::Hop {
                stage: HopStage::Validation,
                service: validation_service.to_string(),
                source,
                verdict: None,
            })?;

        let verdict = ValidationVerdict::from_body(&verdict_body);
        if !verdict.valid {
            return Err(RouteError::ValidationRejected {
                service: validation_service.to_string(),
                reason: verdict
                    .message
                    .unwrap_or_else(|| "Unknown error".to_string()),
                verdict: verdict_body,
            });
        }

        let Some(callback_service) = policy.callback_service.as_deref() else {
            return Ok(RoutingResult::success("Validation passed")
                .with_validation_service(validation_service)
                .with_validation(verdict_body));
        };

        let callback_endpoint = self.resolve(HopStage::Callback, callback_service)?;
        let original = Value::Object(enriched.envelope.payload.clone());

        let committed = self
            .hop(
                HopStage::Callback,
                callback_service,
                callback_endpoint,
                &original,
                Some(&enriched.metadata.esb_message_id),
            )
            .await
            .map_err(|source| RouteError::Hop {
                stage: HopStage::Callback,
                service: callback_service.to_string(),
                source,
                verdict: Some(verdict_body.clone()),
            })?;

        Ok(RoutingResult::success("Validation passed and callback completed")
            .with_validation_service(validation_service)
            .with_validation(verdict_body)
            .with_callback_service(callback_service)
            .with_result(committed))
    }

    fn resolve(&self, stage: HopStage, service: &str) -> Result<&str, RouteError> {
        self.registry
            .resolve(service)
            .ok_or_else(|| RouteError::UnresolvedService {
                stage,
                service: service.to_string(),
            })
    }

    async fn hop(
        &self,
        stage: HopStage,
        service: &str,
        endpoint: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, HopError> {
        debug!(%stage, service, endpoint, "hop");
        let outcome = self.client.post_json(endpoint, body, idempotency_key).await;
        record_hop(stage, outcome.is_ok());
        if let Err(err) = &outcome {
            warn!(%stage, service, error = %err, "hop failed");
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
