use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a valid number, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub sweeper: SweeperConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub request_timeout_seconds: u64,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

// Фоновая очистка броней
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Non-positive values are replaced with the default by the sweeper.
    pub interval_seconds: i64,
    pub tick_timeout_seconds: u64,
}

impl SweeperConfig {
    pub fn tick_timeout(&self) -> Duration {
        Duration::from_secs(self.tick_timeout_seconds)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source, `lookup` returns `None` for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let required = |name: &'static str| lookup(name).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(name));

        Ok(Config {
            app: AppConfig {
                host: or("HOST", "0.0.0.0"),
                port: parse("PORT", or("PORT", "8000"))?,
                environment: or("ENVIRONMENT", "development"),
                rust_log: or("RUST_LOG", "event_booker=debug,tower_http=debug"),
                request_timeout_seconds: parse("REQUEST_TIMEOUT_SECONDS", or("REQUEST_TIMEOUT_SECONDS", "10"))?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parse("DB_POOL_SIZE", or("DB_POOL_SIZE", "20"))?,
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_hours: parse("JWT_EXPIRES_IN_HOURS", or("JWT_EXPIRES_IN_HOURS", "24"))?,
            },
            sweeper: SweeperConfig {
                interval_seconds: parse("SWEEP_INTERVAL_SECONDS", or("SWEEP_INTERVAL_SECONDS", "60"))?,
                tick_timeout_seconds: parse("SWEEP_TICK_TIMEOUT_SECONDS", or("SWEEP_TICK_TIMEOUT_SECONDS", "5"))?,
            },
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
