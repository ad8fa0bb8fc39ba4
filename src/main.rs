use anyhow::Context as _;
use gitops_demo::config::Config;
use gitops_demo::logging;
use gitops_demo::server::{routes, shutdown_channel, Server, SignalListener};
use gitops_demo::version::BuildMetadata;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present; existing env vars take precedence
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    if let Err(e) = logging::init(config.log_format) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cause = format!("{:#}", e);
            error!(error = %cause, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

/// Start the server and block until it has shut down
async fn run(config: Config) -> anyhow::Result<()> {
    let build = BuildMetadata::from_build_env();
    log_startup(&config, &build);

    let signals = SignalListener::register().context("register signal handlers")?;
    let (shutdown_controller, shutdown_signal) = shutdown_channel();

    let server = Server::bind(&config, routes(build)).await?;

    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!(signal = signal, "Initiating graceful shutdown");
        shutdown_controller.shutdown();
    });

    server.run(shutdown_signal).await?;
    Ok(())
}

/// Log the server configuration at startup
fn log_startup(config: &Config, build: &BuildMetadata) {
    let info = build.get();
    info!(
        port = %config.port,
        tag = %info.tag,
        commit = %info.commit,
        build_time = %info.build_time,
        rust_version = %info.rust_version,
        "starting server"
    );
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
