//! `entikit_log` v1:
//! `tracing` subscriber setup shared by the entikit hosts.
//!
//! Library crates only emit `tracing` events; a host (the Python bridge, a
//! test, a binary) calls [`init_logging`] once to decide where they go.

use std::env;
use std::io;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var holding the filter directives (`info`, `entikit_entity=debug`, ...).
pub const C_ENV_LOG_FILTER: &str = "ENTIKIT_LOG";
/// Env var selecting the output format (`pretty` or `json`).
pub const C_ENV_LOG_FORMAT: &str = "ENTIKIT_LOG_FORMAT";
/// Filter used when none is configured.
pub const C_LOG_FILTER_DEFAULT: &str = "info";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter {filter:?}: {message}")]
    Filter { filter: String, message: String },

    /// A global subscriber was installed earlier in this process.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl EnumLogFormat {
    /// Parse a format name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Subscriber options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLogOptions {
    pub format: EnumLogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
    /// Colored output (pretty format only).
    pub if_ansi: bool,
}

impl Default for SpecLogOptions {
    fn default() -> Self {
        Self {
            format: EnumLogFormat::Pretty,
            filter: C_LOG_FILTER_DEFAULT.to_string(),
            if_ansi: true,
        }
    }
}

impl SpecLogOptions {
    /// Defaults overridden by `ENTIKIT_LOG` and `ENTIKIT_LOG_FORMAT`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(c_filter) = env::var(C_ENV_LOG_FILTER)
            && !c_filter.trim().is_empty()
        {
            options.filter = c_filter;
        }
        if let Ok(c_format) = env::var(C_ENV_LOG_FORMAT)
            && let Some(format) = EnumLogFormat::parse(&c_format)
        {
            options.format = format;
        }
        options
    }

    /// Build the `EnvFilter` for these options.
    pub fn env_filter(&self) -> Result<EnvFilter, LogError> {
        EnvFilter::try_new(&self.filter).map_err(|err| LogError::Filter {
            filter: self.filter.clone(),
            message: err.to_string(),
        })
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Fails with [`LogError::AlreadyInitialized`] on a second call instead of
/// panicking, so hosts may call it unconditionally.
pub fn init_logging(options: &SpecLogOptions) -> Result<(), LogError> {
    let env_filter = options.env_filter()?;
    let registry = tracing_subscriber::registry();

    let result = match options.format {
        EnumLogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_current_span(true)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()
        }
        EnumLogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(options.if_ansi)
                .with_filter(env_filter);
            registry.with(fmt_layer).try_init()
        }
    };
    result.map_err(|err| LogError::AlreadyInitialized(err.to_string()))?;

    tracing::debug!(
        format = ?options.format,
        filter = %options.filter,
        "logging initialized"
    );
    Ok(())
}

/// [`init_logging`] with [`SpecLogOptions::from_env`].
pub fn init_logging_from_env() -> Result<(), LogError> {
    init_logging(&SpecLogOptions::from_env())
}
