//! Record shapes exposed by the collaborator services, and the typed wrappers
//! the gateway uses when it reshapes their responses.
//!
//! Timestamps are kept as the ISO-8601 strings the services emit; the gateway
//! forwards them and never does arithmetic on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user record from the user service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
}

/// A membership record from the membership service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub membership_id: i64,
    pub user_id: i64,
    pub plan_type: String,
    pub payment_status: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
}

/// A catalog entry from the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    pub service_id: i64,
    pub name: String,
    pub description: String,
}

/// A provider record from the provider service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: i64,
    pub name: String,
    pub email: String,
    pub services: String,
}

/// Body returned by a validation endpoint, e.g. `POST /users/validate`.
///
/// Only `valid` drives routing; a missing or non-boolean `valid` is a negative
/// verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub message: Option<String>,
}

impl ValidationVerdict {
    /// Reads a verdict out of an arbitrary JSON body.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        Self {
            valid: body.get("valid").and_then(Value::as_bool).unwrap_or(false),
            message: body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Single-record envelope returned by the gateway's convenience endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data,
        }
    }
}

/// List envelope returned by the gateway's convenience endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiListResponse<T> {
    pub status: String,
    pub data: Vec<T>,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl<T> ApiListResponse<T> {
    pub fn success(data: Vec<T>) -> Self {
        Self {
            status: "success".to_string(),
            total: data.len(),
            data,
            skip: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_window(mut self, skip: Option<u64>, limit: Option<u64>) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn verdict_reads_valid_and_message() {
        let v = ValidationVerdict::from_body(&json!({
            "valid": false,
            "message": "User with id 7 does not exist"
        }));
        assert!(!v.valid);
        assert_eq!(v.message.as_deref(), Some("User with id 7 does not exist"));
    }

    #[test]
    fn verdict_without_boolean_valid_is_negative() {
        assert!(!ValidationVerdict::from_body(&json!({})).valid);
        assert!(!ValidationVerdict::from_body(&json!({"valid": "yes"})).valid);
        assert!(!ValidationVerdict::from_body(&json!([true])).valid);
        assert!(ValidationVerdict::from_body(&json!({"valid": true})).valid);
    }

    #[test]
    fn membership_accepts_null_dates() {
        let m: Membership = serde_json::from_value(json!({
            "membership_id": 42,
            "user_id": 7,
            "plan_type": "gold",
            "payment_status": "paid",
            "start_date": "2024-05-01T10:00:00",
            "end_date": null,
            "benefits": null
        }))
        .unwrap();
        assert_eq!(m.membership_id, 42);
        assert!(m.end_date.is_none());
    }

    #[test]
    fn list_response_counts_records() {
        let list = ApiListResponse::success(vec![CatalogService {
            service_id: 1,
            name: "Gym".to_string(),
            description: "Weights".to_string(),
        }])
        .with_window(Some(0), Some(100));
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["limit"], 100);
        assert_eq!(json["data"][0]["name"], "Gym");
    }

    #[test]
    fn user_tolerates_missing_optional_fields() {
        let u: User = serde_json::from_value(json!({
            "user_id": 1, "name": "Ada", "email": "ada@example.com", "status": "active"
        }))
        .unwrap();
        assert!(u.phone.is_none());
    }
}
