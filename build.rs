//! Captures the toolchain version reported by the `/info` endpoint.

use std::process::Command;

fn main() {
    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());

    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GITOPS_DEMO_RUSTC_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=RUSTC");
    println!("cargo:rerun-if-env-changed=GITOPS_DEMO_TAG");
    println!("cargo:rerun-if-env-changed=GITOPS_DEMO_COMMIT");
    println!("cargo:rerun-if-env-changed=GITOPS_DEMO_BUILD_TIME");
}
