//! Message routing pipeline.
//!
//! 1. **Config** (`config`): router identity, version stamp, hop timeout, history size
//! 2. **Routing** (`router`): validate, enrich, look up policy, dispatch hops
//! 3. **Errors** (`error`): failure taxonomy mapped onto `RoutingResult`
//! 4. **History** (`history`): bounded FIFO of recent envelopes and results
//! 5. **Metrics** (`metrics`): route and hop counters

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod router;

pub use config::RouterConfig;
pub use error::RouteError;
pub use history::{HistoryBuffer, HistoryEntry};
pub use router::MessageRouter;
