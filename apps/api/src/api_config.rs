use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use geosession_application::{AppendConcurrency, LocationResolverConfig, SessionHistoryConfig};
use geosession_core::AppError;
use geosession_infrastructure::DEFAULT_SESSION_TABLE;
use tracing_subscriber::EnvFilter;
use url::Url;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendConfig {
    Memory,
    Postgres {
        database_url: String,
        table_name: String,
    },
    Redis {
        redis_url: String,
        key_prefix: String,
    },
}

impl StorageBackendConfig {
    /// Name reported by the health check.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
            Self::Redis { .. } => "redis",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub storage: StorageBackendConfig,
    pub history: SessionHistoryConfig,
    pub location_base_url: Url,
    pub resolver: LocationResolverConfig,
    pub identity_key: Option<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_source(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_source<F>(migrate_only: bool, source: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variable = |name: &str| source(name).filter(|value| !value.trim().is_empty());

        let api_host = variable("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = parse_or(&variable, "API_PORT", 3001_u16)?;
        let frontend_url =
            variable("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let database_url = variable("DATABASE_URL");

        let storage = match variable("SESSION_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StorageBackendConfig::Memory,
            "postgres" => StorageBackendConfig::Postgres {
                database_url: database_url.clone().ok_or_else(|| {
                    AppError::Validation(
                        "DATABASE_URL is required when SESSION_STORAGE is 'postgres'".to_owned(),
                    )
                })?,
                table_name: variable("SESSION_TABLE_NAME")
                    .unwrap_or_else(|| DEFAULT_SESSION_TABLE.to_owned()),
            },
            "redis" => StorageBackendConfig::Redis {
                redis_url: variable("REDIS_URL").ok_or_else(|| {
                    AppError::Validation(
                        "REDIS_URL is required when SESSION_STORAGE is 'redis'".to_owned(),
                    )
                })?,
                key_prefix: variable("SESSION_REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| "geosession:sessions".to_owned()),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "SESSION_STORAGE must be one of 'memory', 'postgres' or 'redis', got '{other}'"
                )));
            }
        };

        let cap = parse_or(&variable, "SESSION_HISTORY_CAP", 5_usize)?;
        if cap == 0 {
            return Err(AppError::Validation(
                "SESSION_HISTORY_CAP must be greater than zero".to_owned(),
            ));
        }

        let concurrency = match variable("SESSION_APPEND_MODE")
            .unwrap_or_else(|| "concurrent".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "concurrent" => AppendConcurrency::Concurrent,
            "serialized" => AppendConcurrency::SerializedPerIdentity,
            other => {
                return Err(AppError::Validation(format!(
                    "SESSION_APPEND_MODE must be either 'concurrent' or 'serialized', got '{other}'"
                )));
            }
        };

        let history = SessionHistoryConfig {
            cap,
            operation_timeout: Duration::from_millis(parse_or(
                &variable,
                "STORAGE_TIMEOUT_MS",
                5_000_u64,
            )?),
            concurrency,
        };

        let location_base_url = variable("LOCATION_API_BASE_URL")
            .unwrap_or_else(|| "http://ip-api.com".to_owned());
        let location_base_url = Url::parse(location_base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid LOCATION_API_BASE_URL '{location_base_url}': {error}"
            ))
        })?;

        let resolver = LocationResolverConfig {
            max_attempts: parse_or(&variable, "LOCATION_MAX_ATTEMPTS", 4_u8)?,
            attempt_timeout: Duration::from_millis(parse_or(
                &variable,
                "LOCATION_TIMEOUT_MS",
                5_000_u64,
            )?),
            retry_backoff: Duration::from_millis(parse_or(
                &variable,
                "LOCATION_RETRY_BACKOFF_MS",
                100_u64,
            )?),
        };
        if resolver.max_attempts == 0 {
            return Err(AppError::Validation(
                "LOCATION_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            frontend_url,
            database_url,
            storage,
            history,
            location_base_url,
            resolver,
            identity_key: variable("SESSION_IDENTITY_KEY"),
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn required_database_url(&self) -> Result<&str, AppError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T, F>(variable: &F, name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match variable(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}
