use async_trait::async_trait;
use serde_json::Value;

/// Failure of a single outbound call.
///
/// Timeouts are kept distinct for logging, but the router treats every
/// variant the same way: as a transport failure of the hop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HopError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("{endpoint} responded with HTTP {status}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("{endpoint} returned a body that is not JSON: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl HopError {
    /// Remote response body, when the collaborator answered with an error status.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            HopError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// HTTP status returned by the collaborator, if it answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            HopError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outbound HTTP seam to collaborator services.
/// Implementations: `reqwest` (production), recording stubs (tests).
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// POST a JSON body and decode the JSON response of a 2xx answer.
    ///
    /// `idempotency_key`, when given, is sent as the `Idempotency-Key` header.
    async fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, HopError>;

    /// GET with query parameters and decode the JSON response of a 2xx answer.
    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, HopError>;
}
