//! Envelope types: the unit of routing.
//!
//! Inbound envelopes are decoded leniently into [`InboundEnvelope`], where every
//! field is optional JSON. [`InboundEnvelope::validate`] turns that into a typed
//! [`Envelope`] or names the first missing or mistyped field. Enrichment then
//! produces an owned [`EnrichedEnvelope`]; the caller's value is only borrowed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::clock::ClockSource;

/// Open key/value payload carried by an envelope.
pub type Payload = Map<String, Value>;

/// Version string stamped on envelopes when none is configured.
pub const DEFAULT_ESB_VERSION: &str = "1.0";

/// Required envelope fields, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 4] = ["source", "destination", "message_type", "payload"];

/// Errors from structural validation of an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid field {field}: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Envelope as submitted by a caller. Nothing is guaranteed present.
///
/// JSON `null` is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl InboundEnvelope {
    /// Builds a complete inbound envelope, as the gateway's convenience
    /// endpoints do when wrapping a flat payload.
    #[must_use]
    pub fn new(source: &str, destination: &str, message_type: &str, payload: Payload) -> Self {
        Self {
            source: Some(Value::String(source.to_string())),
            destination: Some(Value::String(destination.to_string())),
            message_type: Some(Value::String(message_type.to_string())),
            payload: Some(Value::Object(payload)),
        }
    }

    /// Best-effort message type for logging, before validation.
    #[must_use]
    pub fn message_type_hint(&self) -> Option<&str> {
        self.message_type.as_ref().and_then(Value::as_str)
    }

    /// Checks that all four required fields are present and well-typed.
    ///
    /// # Errors
    ///
    /// Returns the first [`EnvelopeError`] found, checking fields in
    /// [`REQUIRED_FIELDS`] order.
    pub fn validate(&self) -> Result<Envelope, EnvelopeError> {
        let source = required_string("source", self.source.as_ref())?;
        let destination = required_string("destination", self.destination.as_ref())?;
        let message_type = required_string("message_type", self.message_type.as_ref())?;
        let payload = match present("payload", self.payload.as_ref())? {
            Value::Object(map) => map.clone(),
            _ => {
                return Err(EnvelopeError::InvalidField {
                    field: "payload",
                    expected: "object",
                })
            }
        };

        Ok(Envelope {
            source,
            destination,
            message_type,
            payload,
        })
    }
}

fn present<'a>(field: &'static str, value: Option<&'a Value>) -> Result<&'a Value, EnvelopeError> {
    match value {
        None | Some(Value::Null) => Err(EnvelopeError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn required_string(field: &'static str, value: Option<&Value>) -> Result<String, EnvelopeError> {
    match present(field, value)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(EnvelopeError::InvalidField {
            field,
            expected: "string",
        }),
    }
}

/// A structurally valid envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub source: String,
    pub destination: String,
    pub message_type: String,
    pub payload: Payload,
}

impl Envelope {
    /// Attaches router metadata, consuming this working copy.
    #[must_use]
    pub fn enrich(self, metadata: EnvelopeMetadata) -> EnrichedEnvelope {
        EnrichedEnvelope {
            envelope: self,
            metadata,
        }
    }
}

/// Metadata stamped by the router. Never supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    /// RFC 3339 UTC time at enrichment.
    pub esb_timestamp: String,
    pub esb_version: String,
    /// Unique per routed envelope; forwarded as the idempotency key.
    pub esb_message_id: String,
}

impl EnvelopeMetadata {
    /// Stamps fresh metadata using the given clock.
    #[must_use]
    pub fn stamp(clock: &dyn ClockSource, version: &str) -> Self {
        Self {
            esb_timestamp: clock.now().to_rfc3339(),
            esb_version: version.to_string(),
            esb_message_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Envelope plus router metadata; serializes flat, as one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEnvelope {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(flatten)]
    pub metadata: EnvelopeMetadata,
}
