//! # dex-config
//!
//! Layered runtime configuration: built-in defaults, then an optional
//! `animedex.toml`, then `ANIMEDEX__SECTION__KEY` environment variables
//! (pre-loaded from `.env`).

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const ENV_PREFIX: &str = "ANIMEDEX";
pub const DEFAULT_CONFIG_FILE: &str = "animedex";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<SecretString>,
    /// Service-role credential; deletes are refused without it.
    pub service_role_url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<SecretString>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub filter_cache_capacity: usize,
    pub search_cache_capacity: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Loads `.env`, then the layered sources.
    ///
    /// `ANIMEDEX_CONFIG` overrides the config file name.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(error = %err, "ignoring unreadable .env"),
        }

        let file = std::env::var("ANIMEDEX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Self::from_sources(Some(&file), None)
    }

    /// `env` replaces the process environment when given.
    pub fn from_sources(
        file: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.body_limit_bytes", 2 * 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", false)?
            .set_default("catalog.page_size", 12)?
            .set_default("catalog.filter_cache_capacity", 100)?
            .set_default("catalog.search_cache_capacity", 50)?
            .set_default("log.format", "pretty")?;

        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "server.body_limit_bytes",
                reason: "must be positive".into(),
            });
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "catalog.page_size",
                reason: "must be positive".into(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_connections",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database.url.as_ref().ok_or(ConfigError::Missing("database.url"))
    }

    pub fn require_jwt_secret(&self) -> Result<&SecretString, ConfigError> {
        self.auth.jwt_secret.as_ref().ok_or(ConfigError::Missing("auth.jwt_secret"))
    }
}
