//! Tracing setup for the placement services.
//!
//! The baseline filter comes from `APP_LOG_LEVEL` via [`TelemetryConfig`]; a
//! `RUST_LOG` value in the environment overrides it wholesale. A bare level
//! such as `info` is widened into a directive set that holds the chatty HTTP
//! dependencies at `warn`.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { directive: String, source: ParseError },
    Init(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { directive, .. } => {
                write!(f, "invalid log filter directive '{}'", directive)
            }
            TelemetryError::Init(err) => {
                write!(f, "could not install the tracing subscriber: {}", err)
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Init(err) => Some(&**err),
        }
    }
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_directive(&config.log_level))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Init)
}

fn parse_filter(directive: String) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&directive)
        .map_err(|source| TelemetryError::Filter { directive, source })
}

/// A configured bare level applies to our code; values that already carry
/// per-target directives pass through untouched.
fn default_directive(log_level: &str) -> String {
    if log_level.contains('=') || log_level.contains(',') {
        log_level.to_string()
    } else {
        format!("{log_level},hyper=warn,tower=warn,mio=warn")
    }
}
