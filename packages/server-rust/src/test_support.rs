//! In-process [`ServiceClient`] stub that records every call.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::traits::{HopError, ServiceClient};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub endpoint: String,
    pub body: Option<Value>,
    pub idempotency_key: Option<String>,
    pub query: Vec<(String, String)>,
}

/// Answers from a per-endpoint script; unscripted endpoints are refused.
#[derive(Debug, Default)]
pub struct RecordingClient {
    script: Mutex<HashMap<String, Result<Value, HopError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, endpoint: &str, body: Value) -> Self {
        self.script.lock().insert(endpoint.to_string(), Ok(body));
        self
    }

    pub fn fail(self, endpoint: &str, err: HopError) -> Self {
        self.script.lock().insert(endpoint.to_string(), Err(err));
        self
    }

    /// Holds every answer back by `delay`; the call is recorded up front.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    async fn answer(&self, endpoint: &str) -> Result<Value, HopError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .get(endpoint)
            .cloned()
            .unwrap_or_else(|| {
                Err(HopError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: "connection refused".to_string(),
                })
            })
    }
}

#[async_trait]
impl ServiceClient for RecordingClient {
    async fn post_json(
        &self,
        endpoint: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, HopError> {
        self.calls.lock().push(RecordedCall {
            method: "POST",
            endpoint: endpoint.to_string(),
            body: Some(body.clone()),
            idempotency_key: idempotency_key.map(str::to_string),
            query: Vec::new(),
        });
        self.answer(endpoint).await
    }

    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, HopError> {
        self.calls.lock().push(RecordedCall {
            method: "GET",
            endpoint: endpoint.to_string(),
            body: None,
            idempotency_key: None,
            query: query.to_vec(),
        });
        self.answer(endpoint).await
    }
}
