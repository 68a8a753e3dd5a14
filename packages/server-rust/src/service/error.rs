//! Routing failure taxonomy and its mapping onto [`RoutingResult`].

use esb_core::{EnvelopeError, HopStage, RoutingResult};
use serde_json::Value;

use crate::traits::HopError;

/// Why routing an envelope stopped short of success.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Malformed envelope; rejected before any I/O.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// No policy for the message type; rejected before any I/O.
    #[error("No routing rule found for message type: {message_type}")]
    UnknownMessageType { message_type: String },
    /// A policy names a service the registry cannot resolve.
    #[error("{} not found: {service}", stage_label(.stage))]
    UnresolvedService { stage: HopStage, service: String },
    /// The validation hop answered with a negative verdict.
    #[error("Validation failed: {reason}")]
    ValidationRejected {
        service: String,
        reason: String,
        verdict: Value,
    },
    /// Transport or protocol failure on one hop.
    #[error("Failed to route message: {source}")]
    Hop {
        stage: HopStage,
        service: String,
        source: HopError,
        /// Verdict of an already-completed validation hop, if any.
        verdict: Option<Value>,
    },
}

fn stage_label(stage: &HopStage) -> &'static str {
    match stage {
        HopStage::Delivery => "Service",
        HopStage::Validation => "Validation service",
        HopStage::Callback => "Callback service",
    }
}

impl RouteError {
    /// Short label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RouteError::Envelope(_) => "malformed_envelope",
            RouteError::UnknownMessageType { .. } => "unknown_message_type",
            RouteError::UnresolvedService { .. } => "unresolved_service",
            RouteError::ValidationRejected { .. } => "validation_rejected",
            RouteError::Hop { .. } => "hop_failed",
        }
    }
}

impl From<RouteError> for RoutingResult {
    fn from(err: RouteError) -> Self {
        let base = RoutingResult::error(err.to_string());
        match err {
            RouteError::Envelope(_) | RouteError::UnknownMessageType { .. } => base,
            RouteError::UnresolvedService { stage, service } => {
                base.with_service_for(stage, service)
            }
            RouteError::ValidationRejected {
                service, verdict, ..
            } => base
                .with_validation_service(service)
                .with_validation(verdict),
            RouteError::Hop {
                stage,
                service,
                source,
                verdict,
            } => {
                let mut result = base.with_service_for(stage, service).with_failed_hop(stage);
                if let Some(body) = source.body() {
                    result = result.with_details(body);
                }
                if let Some(verdict) = verdict {
                    result = result.with_validation(verdict);
                }
                result
            }
        }
    }
}
