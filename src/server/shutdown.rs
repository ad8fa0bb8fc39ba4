//! Graceful shutdown handling
//!
//! SIGTERM and SIGINT are turned into a cancellation token:
//! - `SignalListener` waits for the OS signal
//! - `ShutdownController` triggers shutdown
//! - `ShutdownSignal` is handed to the server, which stops accepting
//!   connections and drains in-flight requests once it fires

use tokio::sync::watch;
use tracing::info;

/// Receiving side of the shutdown channel
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Passed to the server (and cloned for anything else that
///   needs to stop with it)
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// OS termination signals (SIGTERM, SIGINT)
///
/// Handlers are registered up front so that a registration failure is a
/// startup error rather than a silent loss of graceful shutdown.
#[cfg(unix)]
pub struct SignalListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    /// Register SIGTERM and SIGINT handlers
    pub fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the first termination signal
    ///
    /// Returns the signal name that was received.
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => {
                info!("Received SIGTERM");
                "SIGTERM"
            }
            _ = self.sigint.recv() => {
                info!("Received SIGINT");
                "SIGINT"
            }
        }
    }
}

/// Ctrl+C signal (Windows)
#[cfg(not(unix))]
pub struct SignalListener {
    _private: (),
}

#[cfg(not(unix))]
impl SignalListener {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self { _private: () })
    }

    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
        "CTRL_C"
    }
}
