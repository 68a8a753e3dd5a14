use std::time::Duration;

use esb_core::DEFAULT_ESB_VERSION;

/// Configuration for the message router and its history buffer.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Process identity reported by the health endpoint.
    pub service_name: String,
    /// Stamped onto every envelope as `esb_version`.
    pub esb_version: String,
    /// Upper bound for each outbound hop.
    pub hop_timeout: Duration,
    /// Number of (envelope, result) pairs retained for introspection.
    pub history_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            service_name: "esb-core".to_string(),
            esb_version: DEFAULT_ESB_VERSION.to_string(),
            hop_timeout: Duration::from_secs(10),
            history_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_config_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.service_name, "esb-core");
        assert_eq!(config.esb_version, "1.0");
        assert_eq!(config.hop_timeout, Duration::from_secs(10));
        assert_eq!(config.history_capacity, 100);
    }
}
