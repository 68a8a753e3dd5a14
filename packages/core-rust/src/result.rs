//! Normalized routing outcome returned to the gateway and kept in history.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingStatus {
    Success,
    Error,
}

impl RoutingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingStatus::Success => "success",
            RoutingStatus::Error => "error",
        }
    }
}

/// One outbound call within a routing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HopStage {
    /// The only hop of the simple path.
    Delivery,
    /// First hop of the two-step protocol.
    Validation,
    /// Commit hop after a positive verdict.
    Callback,
}

impl HopStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HopStage::Delivery => "delivery",
            HopStage::Validation => "validation",
            HopStage::Callback => "callback",
        }
    }
}

impl fmt::Display for HopStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of routing one envelope. Which optional fields are set depends on
/// the path taken; unset fields are omitted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct RoutingResult {
    pub status: RoutingStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Remote body of a simple-path delivery, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_service: Option<String>,
    /// Validation verdict body, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_service: Option<String>,
    /// Remote body of the callback hop, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_hop: Option<HopStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RoutingResult {
    fn with_status(status: RoutingStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            message_id: None,
            destination: None,
            response: None,
            validation_service: None,
            validation: None,
            callback_service: None,
            result: None,
            failed_hop: None,
            details: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(RoutingStatus::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(RoutingStatus::Error, message)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RoutingStatus::Success
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_destination(mut self, service: impl Into<String>) -> Self {
        self.destination = Some(service.into());
        self
    }

    pub fn with_response(mut self, body: Value) -> Self {
        self.response = Some(body);
        self
    }

    pub fn with_validation_service(mut self, service: impl Into<String>) -> Self {
        self.validation_service = Some(service.into());
        self
    }

    pub fn with_validation(mut self, verdict: Value) -> Self {
        self.validation = Some(verdict);
        self
    }

    pub fn with_callback_service(mut self, service: impl Into<String>) -> Self {
        self.callback_service = Some(service.into());
        self
    }

    pub fn with_result(mut self, body: Value) -> Self {
        self.result = Some(body);
        self
    }

    pub fn with_failed_hop(mut self, stage: HopStage) -> Self {
        self.failed_hop = Some(stage);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attaches `service` under the field that matches the hop it served.
    pub fn with_service_for(self, stage: HopStage, service: impl Into<String>) -> Self {
        match stage {
            HopStage::Delivery => self.with_destination(service),
            HopStage::Validation => self.with_validation_service(service),
            HopStage::Callback => self.with_callback_service(service),
        }
    }
}
