//! Probe and build-info endpoints
//!
//! - `/healthz` - Liveness: Is the process alive?
//! - `/readyz` - Readiness: Can the process take traffic?
//! - `/info` - Build metadata (tag, commit, build time, toolchain)
//!
//! Readiness currently answers exactly like liveness: there are no
//! downstream dependencies to check.

use crate::version::{BuildInfo, BuildMetadata};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const HEALTHZ_PATH: &str = "/healthz";
pub const READYZ_PATH: &str = "/readyz";
pub const INFO_PATH: &str = "/info";

/// Body of the liveness and readiness probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn ready() -> Self {
        Self {
            status: "ready".to_string(),
        }
    }
}

/// Shared state for the route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    build: Arc<BuildMetadata>,
}

impl AppState {
    pub fn new(build: BuildMetadata) -> Self {
        Self {
            build: Arc::new(build),
        }
    }
}

/// Liveness probe handler
///
/// Always returns 200 OK - if this responds, the process is alive.
async fn healthz() -> Json<HealthStatus> {
    info!("liveness probe hit");
    Json(HealthStatus::ok())
}

/// Readiness probe handler
///
/// Always returns 200 OK. A deployment with real dependencies would gate
/// this on their health.
async fn readyz() -> Json<HealthStatus> {
    info!("readiness probe hit");
    Json(HealthStatus::ready())
}

/// Build info handler
///
/// Reads the provider on every call.
async fn info(State(state): State<AppState>) -> Json<BuildInfo> {
    let info = state.build.get();
    info!(tag = %info.tag, commit = %info.commit, "info endpoint hit");
    Json(info)
}

/// Build the route table for the probe and info endpoints
///
/// Unmatched paths fall through to the router's default 404.
pub fn routes(build: BuildMetadata) -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(healthz))
        .route(READYZ_PATH, get(readyz))
        .route(INFO_PATH, get(info))
        .with_state(AppState::new(build))
}
