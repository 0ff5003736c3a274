use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub simulation: SimulationConfig,
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

        let min_delay_ms = parse_u64_var("APP_SIM_MIN_DELAY_MS", 20)?;
        let max_delay_ms = parse_u64_var("APP_SIM_MAX_DELAY_MS", 150)?;
        if min_delay_ms > max_delay_ms {
            return Err(ConfigError::InvalidDelayRange {
                min: min_delay_ms,
                max: max_delay_ms,
            });
        }

        let write_fail_rate = match env::var("APP_SIM_WRITE_FAIL_RATE") {
            Ok(raw) => {
                let rate = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidFailRate)?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(ConfigError::InvalidFailRate);
                }
                rate
            }
            Err(_) => 0.0,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            simulation: SimulationConfig {
                min_delay_ms,
                max_delay_ms,
                write_fail_rate,
            },
        })
    }
}

fn parse_u64_var(name: &'static str, fallback: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { var: name }),
        Err(_) => Ok(fallback),
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

/// Simulated network behavior for the in-process backend: every handler
/// sleeps for a bounded random delay before touching the store, and write
/// handlers fail with the configured probability so optimistic-update
/// rollbacks stay observable.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub write_fail_rate: f64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
    InvalidDelayRange { min: u64, max: u64 },
    InvalidFailRate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{} must be a non-negative integer", var)
            }
            ConfigError::InvalidDelayRange { min, max } => {
                write!(
                    f,
                    "APP_SIM_MIN_DELAY_MS ({min}) must not exceed APP_SIM_MAX_DELAY_MS ({max})"
                )
            }
            ConfigError::InvalidFailRate => {
                write!(f, "APP_SIM_WRITE_FAIL_RATE must be a float in [0.0, 1.0]")
            }
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
