//! Build metadata reported by the `/info` endpoint
//!
//! Tag, commit and build time are injected at compile time:
//!
//! ```text
//! GITOPS_DEMO_TAG=v1.0.0 \
//! GITOPS_DEMO_COMMIT=abc1234 \
//! GITOPS_DEMO_BUILD_TIME=2026-02-26T00:00:00Z \
//!     cargo build --release
//! ```
//!
//! When a variable is not set (or empty) the fallback below applies.

use serde::{Deserialize, Serialize};

/// Tag reported when no release tag was injected
pub const DEFAULT_TAG: &str = "dev";

/// Commit and build time reported when not injected
pub const UNKNOWN: &str = "unknown";

/// Snapshot of the build metadata, serialized as the `/info` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub tag: String,
    pub commit: String,
    pub build_time: String,
    pub rust_version: String,
}

/// Provider for build metadata
///
/// Created once at process start and shared read-only with the request
/// handlers. Tests build their own instance with [`BuildMetadata::new`]
/// instead of mutating process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    tag: String,
    commit: String,
    build_time: String,
}

impl BuildMetadata {
    /// Metadata with explicit values
    pub fn new(
        tag: impl Into<String>,
        commit: impl Into<String>,
        build_time: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            commit: commit.into(),
            build_time: build_time.into(),
        }
    }

    /// Metadata injected by the build, with fallbacks for local builds
    pub fn from_build_env() -> Self {
        Self::new(
            injected(option_env!("GITOPS_DEMO_TAG"), DEFAULT_TAG),
            injected(option_env!("GITOPS_DEMO_COMMIT"), UNKNOWN),
            injected(option_env!("GITOPS_DEMO_BUILD_TIME"), UNKNOWN),
        )
    }

    /// Current build info, including the toolchain version
    pub fn get(&self) -> BuildInfo {
        BuildInfo {
            tag: self.tag.clone(),
            commit: self.commit.clone(),
            build_time: self.build_time.clone(),
            rust_version: runtime_version().to_string(),
        }
    }
}

impl Default for BuildMetadata {
    fn default() -> Self {
        Self::from_build_env()
    }
}

/// Version of the Rust toolchain that built this binary
pub fn runtime_version() -> &'static str {
    env!("GITOPS_DEMO_RUSTC_VERSION")
}

fn injected(value: Option<&'static str>, fallback: &'static str) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}
