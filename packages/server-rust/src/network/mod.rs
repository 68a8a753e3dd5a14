//! Gateway networking: configuration, middleware, handlers, and lifecycle.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use module::GatewayModule;
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
