//! Static service registry: logical service name -> absolute endpoint URL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical service names used by the built-in registry and routing table.
pub mod service_names {
    /// User validation endpoint.
    pub const USER_SERVICE: &str = "user-service";
    /// Internal membership creation endpoint (commit side of the two-step protocol).
    pub const MEMBERSHIP_SERVICE: &str = "membership-service";
    /// User creation endpoint.
    pub const USER_DIRECTORY: &str = "user-directory";
    /// Service catalog creation endpoint.
    pub const CATALOG_SERVICE: &str = "catalog-service";
    /// Provider creation endpoint.
    pub const PROVIDER_SERVICE: &str = "provider-service";
}

/// Errors from building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    EmptyName,
    #[error("endpoint for {name} must be an absolute http(s) URL, got {endpoint:?}")]
    NotAbsolute { name: String, endpoint: String },
}

/// Base URLs of the four collaborator services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstreams {
    pub users: String,
    pub memberships: String,
    pub catalog: String,
    pub providers: String,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            users: "http://users_service:8002".to_string(),
            memberships: "http://membership_service:8004".to_string(),
            catalog: "http://catalog_service:8003".to_string(),
            providers: "http://providers_service:8005".to_string(),
        }
    }
}

impl Upstreams {
    /// Liveness endpoint of each collaborator, keyed by short name.
    ///
    /// The paths are not uniform: the membership service answers on
    /// `/membership/health`, and providers share the catalog's `/catalog/health`.
    #[must_use]
    pub fn health_endpoints(&self) -> [(&'static str, String); 4] {
        [
            ("users", join_url(&self.users, "/users/health")),
            ("memberships", join_url(&self.memberships, "/membership/health")),
            ("catalog", join_url(&self.catalog, "/catalog/health")),
            ("providers", join_url(&self.providers, "/catalog/health")),
        ]
    }
}

/// Joins a base URL and a path without doubling or dropping the slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Read-only after startup; no health tracking, no dynamic membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceRegistry {
    entries: BTreeMap<String, String>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default registry from collaborator base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAbsolute`] if any base URL is not http(s).
    pub fn from_upstreams(upstreams: &Upstreams) -> Result<Self, RegistryError> {
        use service_names::{
            CATALOG_SERVICE, MEMBERSHIP_SERVICE, PROVIDER_SERVICE, USER_DIRECTORY, USER_SERVICE,
        };

        let mut registry = Self::new();
        registry.insert(USER_SERVICE, join_url(&upstreams.users, "/users/validate"))?;
        registry.insert(
            MEMBERSHIP_SERVICE,
            join_url(&upstreams.memberships, "/memberships/internal/create"),
        )?;
        registry.insert(USER_DIRECTORY, join_url(&upstreams.users, "/users/"))?;
        registry.insert(CATALOG_SERVICE, join_url(&upstreams.catalog, "/services/"))?;
        registry.insert(PROVIDER_SERVICE, join_url(&upstreams.providers, "/providers/"))?;
        Ok(registry)
    }

    /// Adds or replaces an entry.
    ///
    /// # Errors
    ///
    /// Rejects empty names and endpoints that are not absolute http(s) URLs.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let endpoint = endpoint.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let absolute = ["http://", "https://"]
            .iter()
            .any(|scheme| endpoint.len() > scheme.len() && endpoint.starts_with(scheme));
        if !absolute {
            return Err(RegistryError::NotAbsolute { name, endpoint });
        }
        self.entries.insert(name, endpoint);
        Ok(())
    }

    /// Resolves a logical name to its endpoint.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
