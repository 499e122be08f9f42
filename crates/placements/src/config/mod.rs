use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::allocation::coordinator::{CoordinatorConfig, FacultyGate};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub allocation: AllocationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let retry_limit = env::var("APP_ASSIGN_RETRY_LIMIT")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidRetryLimit)?;

        let faculty_gate = match env::var("APP_FACULTY_ASSIGNMENT_GATE") {
            Ok(value) => parse_faculty_gate(&value)?,
            Err(_) => FacultyGate::ApprovedOnly,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            allocation: AllocationConfig {
                retry_limit,
                faculty_gate,
            },
        })
    }
}

fn parse_faculty_gate(value: &str) -> Result<FacultyGate, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "approved_only" | "approved-only" => Ok(FacultyGate::ApprovedOnly),
        "pre_approval" | "pre-approval" => Ok(FacultyGate::PreApprovalAllowed),
        _ => Err(ConfigError::InvalidFacultyGate {
            value: value.to_string(),
        }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for the assignment coordinator.
#[derive(Debug, Clone)]
pub struct AllocationConfig {
    pub retry_limit: u32,
    pub faculty_gate: FacultyGate,
}

impl AllocationConfig {
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            retry_limit: self.retry_limit,
            faculty_gate: self.faculty_gate,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRetryLimit,
    InvalidFacultyGate { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRetryLimit => {
                write!(f, "APP_ASSIGN_RETRY_LIMIT must be a valid u32")
            }
            ConfigError::InvalidFacultyGate { value } => write!(
                f,
                "APP_FACULTY_ASSIGNMENT_GATE must be 'approved_only' or 'pre_approval', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
