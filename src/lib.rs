//! Minimal HTTP service exposing liveness, readiness and build-info
//! endpoints, used as a deployment target for orchestration platforms.

pub mod config;
pub mod logging;
pub mod server;
pub mod version;
