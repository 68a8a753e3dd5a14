//! Routing table: message type -> routing policy.
//!
//! The table is built once at process start, either from
//! [`RoutingTable::builtin`] or from a JSON document shaped like the
//! `routing_rules` section of the `/esb/services` introspection endpoint:
//!
//! ```json
//! {
//!   "membership.create": {
//!     "destination_service": "user-service",
//!     "transformer": "membership_to_user_validation",
//!     "validation_required": true,
//!     "callback_service": "membership-service"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registry::{service_names, ServiceRegistry};
use crate::transform::Transformer;

/// Message types handled by the built-in table.
pub mod message_types {
    pub const MEMBERSHIP_CREATE: &str = "membership.create";
    pub const USER_VALIDATE: &str = "user.validate";
    pub const USER_CREATE: &str = "user.create";
    pub const SERVICE_CREATE: &str = "service.create";
    pub const PROVIDER_CREATE: &str = "provider.create";
}

/// Errors from loading a routing table.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid routing table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("message type must not be empty")]
    EmptyMessageType,
    #[error("policy for {message_type} has an empty destination_service")]
    EmptyDestination { message_type: String },
}

/// Immutable routing rule for one message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingPolicy {
    /// Logical name resolved through the service registry.
    pub destination_service: String,
    /// Applied to the payload before the first hop.
    #[serde(default)]
    pub transformer: Transformer,
    /// Selects the two-step validate/commit protocol.
    #[serde(default)]
    pub validation_required: bool,
    /// Only invoked when validation reports `valid: true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_service: Option<String>,
}

impl RoutingPolicy {
    /// Single-hop policy.
    #[must_use]
    pub fn simple(destination: &str, transformer: Transformer) -> Self {
        Self {
            destination_service: destination.to_string(),
            transformer,
            validation_required: false,
            callback_service: None,
        }
    }

    /// Two-step policy: validate at `destination`, then optionally commit at `callback`.
    #[must_use]
    pub fn validated(destination: &str, transformer: Transformer, callback: Option<&str>) -> Self {
        Self {
            destination_service: destination.to_string(),
            transformer,
            validation_required: true,
            callback_service: callback.map(str::to_string),
        }
    }

    /// Every logical service this policy may call.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.destination_service.as_str()).chain(self.callback_service.as_deref())
    }
}

/// Startup diagnostics that do not prevent the table from loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyWarning {
    /// A policy names a service the registry cannot resolve.
    UnresolvedService {
        message_type: String,
        service: String,
    },
    /// A callback on a single-hop policy is never invoked.
    IgnoredCallback {
        message_type: String,
        service: String,
    },
}

impl fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyWarning::UnresolvedService {
                message_type,
                service,
            } => write!(
                f,
                "routing rule {message_type} references unregistered service {service}"
            ),
            PolicyWarning::IgnoredCallback {
                message_type,
                service,
            } => write!(
                f,
                "routing rule {message_type} sets callback {service} without validation_required; it will not be called"
            ),
        }
    }
}

/// Read-only after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoutingTable {
    policies: BTreeMap<String, RoutingPolicy>,
}

impl RoutingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules for the user / membership / catalog / provider services.
    #[must_use]
    pub fn builtin() -> Self {
        use message_types::{
            MEMBERSHIP_CREATE, PROVIDER_CREATE, SERVICE_CREATE, USER_CREATE, USER_VALIDATE,
        };
        use service_names::{
            CATALOG_SERVICE, MEMBERSHIP_SERVICE, PROVIDER_SERVICE, USER_DIRECTORY, USER_SERVICE,
        };

        let mut table = Self::new();
        table.policies.insert(
            MEMBERSHIP_CREATE.to_string(),
            RoutingPolicy::validated(
                USER_SERVICE,
                Transformer::MembershipToUserValidation,
                Some(MEMBERSHIP_SERVICE),
            ),
        );
        table.policies.insert(
            USER_VALIDATE.to_string(),
            RoutingPolicy::validated(USER_SERVICE, Transformer::MembershipToUserValidation, None),
        );
        table.policies.insert(
            USER_CREATE.to_string(),
            RoutingPolicy::simple(USER_DIRECTORY, Transformer::Passthrough),
        );
        table.policies.insert(
            SERVICE_CREATE.to_string(),
            RoutingPolicy::simple(CATALOG_SERVICE, Transformer::Passthrough),
        );
        table.policies.insert(
            PROVIDER_CREATE.to_string(),
            RoutingPolicy::simple(PROVIDER_SERVICE, Transformer::Passthrough),
        );
        table
    }

    /// Parses a table from JSON.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, unknown transformer names, unknown policy
    /// keys, and empty message types or destinations.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policies: BTreeMap<String, RoutingPolicy> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (message_type, policy) in policies {
            table.insert(message_type, policy)?;
        }
        Ok(table)
    }

    /// Adds or replaces a policy.
    ///
    /// # Errors
    ///
    /// Rejects an empty message type or destination.
    pub fn insert(
        &mut self,
        message_type: impl Into<String>,
        policy: RoutingPolicy,
    ) -> Result<(), PolicyError> {
        let message_type = message_type.into();
        if message_type.trim().is_empty() {
            return Err(PolicyError::EmptyMessageType);
        }
        if policy.destination_service.trim().is_empty() {
            return Err(PolicyError::EmptyDestination { message_type });
        }
        self.policies.insert(message_type, policy);
        Ok(())
    }

    /// Looks up the policy for a message type.
    #[must_use]
    pub fn get(&self, message_type: &str) -> Option<&RoutingPolicy> {
        self.policies.get(message_type)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies in message-type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoutingPolicy)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Cross-checks the table against a registry.
    ///
    /// Unresolved services are reported, not rejected: the router still
    /// answers such messages with a per-request configuration error.
    #[must_use]
    pub fn check(&self, registry: &ServiceRegistry) -> Vec<PolicyWarning> {
        let mut warnings = Vec::new();
        for (message_type, policy) in &self.policies {
            if let (false, Some(callback)) = (policy.validation_required, &policy.callback_service)
            {
                warnings.push(PolicyWarning::IgnoredCallback {
                    message_type: message_type.clone(),
                    service: callback.clone(),
                });
            }
            for service in policy.services() {
                if !registry.contains(service) {
                    warnings.push(PolicyWarning::UnresolvedService {
                        message_type: message_type.clone(),
                        service: service.to_string(),
                    });
                }
            }
        }
        warnings
    }
}
