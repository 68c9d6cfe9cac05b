//! Structured logging utilities for Kolekto components.
//!
//! Every event carries a `component` field so output can be filtered per
//! subsystem.
//!
//! # Usage
//!
//! ```ignore
//! use kolekto_config::{log_gc_info, log_link_warn};
//!
//! log_gc_info!("Removed orphan", id = "2fd4e1c6");
//! log_link_warn!("Skipping foreign file", path = "Titles/notes.txt");
//! ```

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Level selected by a `-v` repeat count.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// === GC logging macros ===

#[macro_export]
macro_rules! log_gc_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "GC", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_gc_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "GC", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_gc_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "GC", $($key = $value,)* $msg)
    };
}

// === LINK logging macros ===

#[macro_export]
macro_rules! log_link_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "LINK", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_link_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "LINK", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_link_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "LINK", $($key = $value,)* $msg)
    };
}

// === IMPORT logging macros ===

#[macro_export]
macro_rules! log_import_warn {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::warn!(component = "IMPORT", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_import_info {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(component = "IMPORT", $($key = $value,)* $msg)
    };
}

#[macro_export]
macro_rules! log_import_debug {
    ($msg:literal $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::debug!(component = "IMPORT", $($key = $value,)* $msg)
    };
}

/// Initialize logging. Call this once at application startup.
///
/// `KOLEKTO_LOG` wins over `RUST_LOG`; `level` applies when neither is set.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_env("KOLEKTO_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
