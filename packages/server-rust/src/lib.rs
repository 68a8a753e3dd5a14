//! ESB gateway server: message router, validate/commit protocol, and the
//! axum ingress in front of them.

pub mod cli;
pub mod client;
pub mod network;
pub mod service;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use client::HttpServiceClient;
pub use network::GatewayModule;
pub use service::{HistoryBuffer, MessageRouter, RouteError, RouterConfig};
pub use traits::{HopError, ServiceClient};
