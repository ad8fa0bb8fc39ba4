//! HTTP server for probe and build-info endpoints
//!
//! Provides:
//! - `/healthz` - Liveness probe (process is running)
//! - `/readyz` - Readiness probe
//! - `/info` - Build metadata
//!
//! Also provides per-request logging and graceful shutdown handling for
//! SIGTERM/SIGINT.

mod health;
mod idle;
mod lifecycle;
mod request_log;
pub mod shutdown;

pub use health::{routes, AppState, HealthStatus, HEALTHZ_PATH, INFO_PATH, READYZ_PATH};
pub use idle::IdleTimeout;
pub use lifecycle::{build_app, LifecyclePhase, Server, ServerError};
pub use request_log::{RequestLog, RequestLogLayer};
pub use shutdown::{shutdown_channel, ShutdownController, ShutdownSignal, SignalListener};

#[cfg(test)]
mod test_logs;

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "request_log_test.rs"]
mod request_log_tests;

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
