use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};

use crate::constants::DEFAULT_SESSION_LIFETIME_HOURS;

/// Database and cache settings, shared by the server and the data loader.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub storage: StorageConfig,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment misconfigured: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        info!("Loaded variables from .env");
    }
}

impl StorageConfig {
    /// Reads the storage settings only, after loading a `.env` file from the
    /// working directory if there is one.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_env()
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            redis_url: var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            run_migrations: try_load("RUN_MIGRATIONS", "true")?,
        })
    }
}

impl Config {
    /// Reads the configuration from the environment, after loading a `.env`
    /// file from the working directory if there is one.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_env()
    }

    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("PORT", "8000")?,
            storage: StorageConfig::from_env()?,
            jwt_secret: require("JWT_SECRET")?,
            session_lifetime_hours: try_load(
                "SESSION_LIFETIME_HOURS",
                &DEFAULT_SESSION_LIFETIME_HOURS.to_string(),
            )?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not set");
    })
}

fn require(key: &str) -> Result<String, ConfigError> {
    var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError {
            info: format!("{key} is required"),
        })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ConfigError {
                info: format!("Invalid {key} value: {e}"),
            }
        })
}
