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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
        })
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

/// Credentials and endpoint for the external record store.
///
/// Validated up front so a typo surfaces as a startup failure instead of a
/// confusing 401 on the first fetch.
#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub api_url: String,
}

const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

impl AirtableConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_key = env::var("AIRTABLE_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;
        let base_id = env::var("AIRTABLE_BASE_ID").map_err(|_| ConfigError::MissingBaseId)?;
        let api_url =
            env::var("AIRTABLE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Self::new(api_key, base_id, api_url)
    }

    pub fn new(api_key: String, base_id: String, api_url: String) -> Result<Self, ConfigError> {
        let api_key = api_key.trim().to_string();
        if !(api_key.starts_with("pat") || api_key.starts_with("key")) {
            return Err(ConfigError::InvalidApiKey);
        }

        let base_id = base_id.trim().to_string();
        if !base_id.starts_with("app") {
            return Err(ConfigError::InvalidBaseId);
        }

        Ok(Self {
            api_key,
            base_id,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingApiKey,
    InvalidApiKey,
    MissingBaseId,
    InvalidBaseId,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingApiKey => {
                write!(f, "AIRTABLE_API_KEY is required to reach the record store")
            }
            ConfigError::InvalidApiKey => {
                write!(f, "AIRTABLE_API_KEY must start with 'pat' or 'key'")
            }
            ConfigError::MissingBaseId => {
                write!(f, "AIRTABLE_BASE_ID is required to reach the record store")
            }
            ConfigError::InvalidBaseId => write!(f, "AIRTABLE_BASE_ID must start with 'app'"),
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
