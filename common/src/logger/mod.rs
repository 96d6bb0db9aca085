// Copyright (c) 2024 Botho Foundation

//! Logging setup.
//!
//! All crates log through the `tracing` macros. Binaries call
//! [`init_tracing`] once at startup; the filter comes from `RUST_LOG` when it
//! is set and from [`LogConfig::filter`] otherwise.

use serde::{Deserialize, Serialize};
use std::{
    env,
    io::{self, IsTerminal},
    sync::Once,
    time::Instant,
};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("JSON log output requested but the json-logs feature is disabled")]
    JsonUnavailable,
}

/// Logging section of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `nuoi_runtime=debug,info`
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit one JSON object per event instead of the terminal format
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Config used by `--verbose`.
    pub fn verbose() -> Self {
        Self {
            filter: "debug".to_string(),
            json: false,
        }
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        if let Ok(from_env) = EnvFilter::try_from_default_env() {
            return Ok(from_env);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| LoggerError::InvalidFilter {
            filter: self.filter.clone(),
            reason: e.to_string(),
        })
    }
}

/// Install the global subscriber. Later calls are no-ops, so tests may call
/// it freely.
pub fn init_tracing(config: &LogConfig) -> Result<(), LoggerError> {
    let filter = config.env_filter()?;
    if config.json && !cfg!(feature = "json-logs") {
        return Err(LoggerError::JsonUnavailable);
    }

    INIT.call_once(|| {
        // A subscriber installed by someone else wins.
        if config.json {
            init_json(filter);
        } else {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(io::stderr().is_terminal())
                        .with_writer(io::stderr),
                )
                .try_init();
        }
    });

    Ok(())
}

#[cfg(feature = "json-logs")]
fn init_json(filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
        .try_init();
}

#[cfg(not(feature = "json-logs"))]
fn init_json(_filter: EnvFilter) {}

/// Subscriber for unit and integration tests; output is captured per test.
pub fn init_test_tracing() {
    if env::var("RUST_LOG").is_err() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Logs the elapsed time of a scope at trace level when dropped.
pub struct TraceTime {
    msg: &'static str,
    start: Instant,
}

impl TraceTime {
    pub fn new(msg: &'static str) -> Self {
        Self {
            msg,
            start: Instant::now(),
        }
    }
}

impl Drop for TraceTime {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::trace!(duration_ms = elapsed_ms, "{}: took {:.2}ms", self.msg, elapsed_ms);
    }
}
