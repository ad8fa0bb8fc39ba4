//! Process configuration
//!
//! Values come from the environment. `main` loads an optional `.env` file
//! first (via `dotenvy`); variables already set in the process win.

use std::time::Duration;

/// Port used when `PORT` is unset or empty
pub const DEFAULT_PORT: &str = "8080";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable lines for local development
    Text,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`; unknown values fall back to JSON
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        }
    }
}

/// Server-level timeouts bounding the resources held per connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// Time allowed to receive the request head
    pub header_read: Duration,
    /// Time allowed to receive the request body
    pub read: Duration,
    /// Time allowed for the handler to produce a response
    pub write: Duration,
    /// Time a connection may sit without any reads or writes
    pub idle: Duration,
    /// Time in-flight requests get to finish once shutdown starts
    pub shutdown: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            header_read: Duration::from_secs(10),
            read: Duration::from_secs(30),
            write: Duration::from_secs(30),
            idle: Duration::from_secs(120),
            shutdown: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Port to listen on, kept as given so that bad values surface as
    /// listen errors
    pub port: String,
    pub log_format: LogFormat,
    pub timeouts: ServerTimeouts,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = non_empty(lookup("PORT")).unwrap_or_else(|| DEFAULT_PORT.to_string());
        let log_format = non_empty(lookup("LOG_FORMAT"))
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Self {
            port,
            log_format,
            timeouts: ServerTimeouts::default(),
        }
    }

    /// Address the server binds to (all interfaces)
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
