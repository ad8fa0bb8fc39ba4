//! HTTP server lifecycle
//!
//! `Initializing -> Listening -> ShuttingDown -> Stopped`, with `Failed`
//! as the terminal state for bind, accept and drain failures.
//!
//! - `Server::bind` builds the app (routes, timeouts, request logging),
//!   configures HTTP/1 connections and binds the listener
//! - `Server::run` accepts connections until the shutdown signal fires or
//!   the accept loop fails, then drains in-flight requests within the
//!   shutdown deadline

use super::idle::IdleTimeout;
use super::request_log::RequestLogLayer;
use super::shutdown::ShutdownSignal;
use crate::config::{Config, ServerTimeouts};
use axum::{extract::ConnectInfo, http::Request, Router};
use hyper::{body::Incoming, server::conn::http1};
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    server::graceful::GracefulShutdown,
};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower::Service;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tracing::{debug, error, info, warn};

/// Where the server is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Initializing,
    Listening,
    ShuttingDown,
    Stopped,
    Failed,
}

/// Fatal server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be resolved or bound
    #[error("server listen on {addr}")]
    Listen {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The accept loop failed after startup
    #[error("server listen: accept failed")]
    Accept(#[source] io::Error),

    /// In-flight requests outlived the shutdown deadline
    #[error("graceful shutdown: connections still active after {0:?}")]
    ShutdownTimeout(Duration),
}

/// Wrap a route table with the server-level middleware
///
/// Innermost first: request body read timeout, handler timeout (408 on
/// expiry), request logging. Logging is outermost so that timeouts and
/// unmatched routes are logged like any other response.
#[allow(deprecated)]
pub fn build_app(routes: Router, timeouts: &ServerTimeouts) -> Router {
    routes
        .layer(RequestBodyTimeoutLayer::new(timeouts.read))
        .layer(TimeoutLayer::new(timeouts.write))
        .layer(RequestLogLayer)
}

/// A bound HTTP server, ready to run
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
    http: http1::Builder,
    timeouts: ServerTimeouts,
    phase: watch::Sender<LifecyclePhase>,
}

impl Server {
    /// Build the app and bind the listen address from `config`
    ///
    /// # Errors
    /// `ServerError::Listen` if the address is invalid or already in use.
    pub async fn bind(config: &Config, routes: Router) -> Result<Self, ServerError> {
        let (phase, _) = watch::channel(LifecyclePhase::Initializing);

        let app = build_app(routes, &config.timeouts);

        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(config.timeouts.header_read)
            .keep_alive(true);

        let addr = config.listen_addr();
        let bound = match TcpListener::bind(addr.as_str()).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(source) => return Err(ServerError::Listen { addr, source }),
        };

        phase.send_replace(LifecyclePhase::Listening);
        info!(address = %local_addr, "HTTP server listening");

        Ok(Self {
            listener,
            local_addr,
            app,
            http,
            timeouts: config.timeouts.clone(),
            phase,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Watch lifecycle transitions
    pub fn phase(&self) -> watch::Receiver<LifecyclePhase> {
        self.phase.subscribe()
    }

    /// Serve until `shutdown` fires or accepting fails, then drain
    ///
    /// Returns `Ok(())` only when every in-flight request finished within
    /// the shutdown deadline. A fatal accept failure is returned after the
    /// drain; a missed deadline aborts the remaining connections and
    /// returns `ServerError::ShutdownTimeout`.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let Server {
            listener,
            local_addr: _,
            app,
            http,
            timeouts,
            phase,
        } = self;

        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("shutdown signal received");
                    break Ok(());
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = %e, "Connection task panicked");
                        }
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let io = TokioIo::new(IdleTimeout::new(stream, timeouts.idle));
                            let app = app.clone();
                            let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
                                request.extensions_mut().insert(ConnectInfo(remote_addr));
                                app.clone().call(request)
                            });

                            let conn = graceful.watch(http.serve_connection(io, service));
                            connections.spawn(async move {
                                if let Err(e) = conn.await {
                                    debug!(remote_addr = %remote_addr, error = %e, "Connection closed with error");
                                }
                            });
                        }
                        Err(e) => match AcceptErrorKind::of(&e) {
                            AcceptErrorKind::Connection => {
                                debug!(error = %e, "Connection dropped during accept");
                            }
                            AcceptErrorKind::ResourceExhausted => {
                                warn!(error = %e, backoff = ?ACCEPT_BACKOFF, "Accept failed, retrying");
                                tokio::time::sleep(ACCEPT_BACKOFF).await;
                            }
                            AcceptErrorKind::Fatal => break Err(ServerError::Accept(e)),
                        },
                    }
                }
            }
        };

        // Stop accepting before draining
        drop(listener);
        phase.send_replace(LifecyclePhase::ShuttingDown);
        info!(
            connections = connections.len(),
            deadline = ?timeouts.shutdown,
            "Draining in-flight connections"
        );

        let drained = tokio::time::timeout(timeouts.shutdown, graceful.shutdown())
            .await
            .is_ok();

        if drained {
            while connections.join_next().await.is_some() {}
        } else {
            warn!(
                connections = connections.len(),
                deadline = ?timeouts.shutdown,
                "Shutdown deadline exceeded, abandoning connections"
            );
            connections.shutdown().await;
        }

        let result = match outcome {
            Err(e) => Err(e),
            Ok(()) if !drained => Err(ServerError::ShutdownTimeout(timeouts.shutdown)),
            Ok(()) => Ok(()),
        };

        match &result {
            Ok(()) => {
                phase.send_replace(LifecyclePhase::Stopped);
                info!("server stopped gracefully");
            }
            Err(_) => {
                phase.send_replace(LifecyclePhase::Failed);
            }
        }

        result
    }
}

/// Pause before accepting again when the process is out of descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// `EMFILE`, `ENFILE`, `ENOBUFS`, `ENOMEM`
#[cfg(any(target_os = "linux", target_os = "android"))]
const RESOURCE_EXHAUSTED_ERRNOS: &[i32] = &[24, 23, 105, 12];
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const RESOURCE_EXHAUSTED_ERRNOS: &[i32] = &[24, 23, 55, 12];
#[cfg(not(unix))]
const RESOURCE_EXHAUSTED_ERRNOS: &[i32] = &[];

/// How the accept loop reacts to a failed `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AcceptErrorKind {
    /// Concerns a single connection, not the listener: skip it
    Connection,
    /// Out of descriptors or buffers: back off and keep accepting
    ResourceExhausted,
    /// The listener itself is broken
    Fatal,
}

impl AcceptErrorKind {
    pub(crate) fn of(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => Self::Connection,
            _ if is_resource_exhausted(e) => Self::ResourceExhausted,
            _ => Self::Fatal,
        }
    }
}

fn is_resource_exhausted(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::OutOfMemory {
        return true;
    }
    match e.raw_os_error() {
        Some(code) => RESOURCE_EXHAUSTED_ERRNOS.contains(&code),
        None => false,
    }
}
