use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::attendance::DEFAULT_MONTHLY_LIMIT;
use crate::workflows::geofence::AcquisitionSettings;

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
    pub backend: BackendConfig,
    pub geofence: GeofenceConfig,
    pub attendance: AttendanceConfig,
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
        let format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let base_url = env::var("ATTENDANCE_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string());

        let geofence = GeofenceConfig {
            provider_timeout_ms: number_var("GEOFENCE_PROVIDER_TIMEOUT_MS", 7_000)?,
            guard_timeout_ms: number_var("GEOFENCE_GUARD_TIMEOUT_MS", 8_000)?,
            cached_fix_max_age_ms: number_var("GEOFENCE_CACHED_FIX_MAX_AGE_MS", 60_000)?,
        };
        if geofence.guard_timeout_ms <= geofence.provider_timeout_ms {
            return Err(ConfigError::GuardNotAfterProvider {
                provider_ms: geofence.provider_timeout_ms,
                guard_ms: geofence.guard_timeout_ms,
            });
        }

        let wfh_monthly_limit = number_var("WFH_MONTHLY_LIMIT", DEFAULT_MONTHLY_LIMIT)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level, format },
            backend: BackendConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
            geofence,
            attendance: AttendanceConfig { wfh_monthly_limit },
        })
    }
}

fn number_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Where the attendance backend lives.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

/// Position acquisition timers, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeofenceConfig {
    pub provider_timeout_ms: u64,
    pub guard_timeout_ms: u64,
    pub cached_fix_max_age_ms: u64,
}

impl GeofenceConfig {
    pub fn acquisition_settings(&self) -> AcquisitionSettings {
        AcquisitionSettings {
            provider_timeout: Duration::from_millis(self.provider_timeout_ms),
            guard_timeout: Duration::from_millis(self.guard_timeout_ms),
            opportunistic_max_age: Duration::from_millis(self.cached_fix_max_age_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceConfig {
    pub wfh_monthly_limit: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    GuardNotAfterProvider { provider_ms: u64, guard_ms: u64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{} must be a non-negative integer", key)
            }
            ConfigError::GuardNotAfterProvider {
                provider_ms,
                guard_ms,
            } => write!(
                f,
                "GEOFENCE_GUARD_TIMEOUT_MS ({}) must exceed GEOFENCE_PROVIDER_TIMEOUT_MS ({})",
                guard_ms, provider_ms
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::GuardNotAfterProvider { .. } => None,
        }
    }
}
