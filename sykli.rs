//! Sykli CI pipeline for gitops-demo
//!
//! Run locally: sykli run
//! Or: cargo run --bin sykli --features sykli -- --emit | sykli run -

use sykli::{Condition, Pipeline, Template};

fn main() {
    let mut p = Pipeline::new();

    // === RESOURCES ===
    let src = p.dir(".");
    let cargo_registry = p.cache("cargo-registry");
    let cargo_git = p.cache("cargo-git");
    let target_cache = p.cache("target");

    // === TEMPLATE ===
    let rust = Template::new()
        .container("rust:1.85")
        .mount_dir(&src, "/src")
        .mount_cache(&cargo_registry, "/usr/local/cargo/registry")
        .mount_cache(&cargo_git, "/usr/local/cargo/git")
        .mount_cache(&target_cache, "/src/target")
        .workdir("/src");

    // === TASKS ===

    let _ = p
        .task("test")
        .from(&rust)
        .run("cargo test")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("lint")
        .from(&rust)
        .run("cargo clippy --all-targets -- -D warnings")
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"]);

    let _ = p
        .task("fmt")
        .from(&rust)
        .run("cargo fmt -- --check")
        .inputs(&["**/*.rs"]);

    // Release binary with build metadata baked in
    let _ = p
        .task("build")
        .from(&rust)
        .run(
            r#"GITOPS_DEMO_TAG="$(git describe --tags --always 2>/dev/null || echo dev)" \
GITOPS_DEMO_COMMIT="$(git rev-parse --short HEAD 2>/dev/null || echo unknown)" \
GITOPS_DEMO_BUILD_TIME="$(date -u +%Y-%m-%dT%H:%M:%SZ)" \
cargo build --release --bin gitops-demo"#,
        )
        .inputs(&["**/*.rs", "Cargo.toml", "Cargo.lock"])
        .output("binary", "target/release/gitops-demo")
        .after(&["test", "lint", "fmt"]);

    // Start the binary, probe every endpoint, then check it stops on SIGTERM
    let _ = p
        .task("smoke-test")
        .from(&rust)
        .run(
            r#"#!/bin/bash
set -e

PORT=18080 ./target/release/gitops-demo > /tmp/gitops-demo.log 2>&1 &
PID=$!
sleep 1

test "$(curl -sf http://127.0.0.1:18080/healthz)" = '{"status":"ok"}'
test "$(curl -sf http://127.0.0.1:18080/readyz)" = '{"status":"ready"}'
curl -sf http://127.0.0.1:18080/info | grep -q '"rust_version"'
test "$(curl -s -o /dev/null -w '%{http_code}' http://127.0.0.1:18080/nope)" = "404"

kill -TERM $PID
wait $PID
grep -q "server stopped gracefully" /tmp/gitops-demo.log

echo "Smoke test passed"
"#,
        )
        .input_from("build", "binary", "/src/target/release/gitops-demo")
        .when_cond(Condition::event("push").or(Condition::negate(Condition::branch("*"))))
        .timeout(120);

    p.emit();
}
