//! Per-request access logging
//!
//! Implemented as a Tower Layer/Service wrapping the whole router, so
//! 404s and timeout responses are logged the same way as handler
//! responses. Emits exactly one event per request once the response is
//! ready; the response itself is passed through untouched.

use axum::{body::Body, extract::ConnectInfo, http::Request, response::Response};
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{info, warn};

/// Tower Layer for request logging
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog { inner }
    }
}

/// Tower Service that logs method, path, status, duration and peer address
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLog<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let remote_addr = remote_addr(&request);
        let start = Instant::now();

        // Take the service that was driven to readiness, leave a clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(request).await;
            let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

            match &result {
                Ok(response) => info!(
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    duration_us,
                    remote_addr = %remote_addr,
                    "request completed"
                ),
                Err(e) => warn!(
                    method = %method,
                    path = %path,
                    duration_us,
                    remote_addr = %remote_addr,
                    error = %e,
                    "request failed"
                ),
            }

            result
        })
    }
}

/// Peer address recorded by the server, if any
fn remote_addr<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
