//! `reqwest`-backed [`ServiceClient`] with a bounded per-hop timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::traits::{HopError, ServiceClient};

/// Header carrying the envelope's idempotency token on commit-style hops.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// HTTP client shared by every hop; cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpServiceClient {
    /// Builds a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("esb-server/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, timeout })
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ServiceClient for HttpServiceClient {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, HopError> {
        debug!(endpoint, "POST");
        let mut request = self.http.post(endpoint).json(body);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;
        read_json(endpoint, response).await
    }

    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, HopError> {
        debug!(endpoint, "GET");
        let response = self
            .http
            .get(endpoint)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, &e))?;
        read_json(endpoint, response).await
    }
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> HopError {
    if err.is_timeout() {
        HopError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        HopError::Transport {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Non-2xx is an error carrying the body; an empty 2xx body decodes as `null`.
async fn read_json(endpoint: &str, response: reqwest::Response) -> Result<Value, HopError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(endpoint, &e))?;

    if !status.is_success() {
        return Err(HopError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| HopError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
