//! # configs
//!
//! Layered application settings. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. `YELPCAMP__SECTION__KEY` environment variables (a `.env` file is honoured)
//!
//! Secrets are held as [`SecretString`] so they never end up in logs.

use std::net::SocketAddr;
use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "YELPCAMP";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a request body, uploads included
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("server address: {err}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to the in-memory store when unset.
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    #[default]
    Memory,
    Local,
    Cloudinary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub backend: MediaBackend,
    pub local: LocalMediaConfig,
    pub cloudinary: Option<CloudinaryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalMediaConfig {
    pub root: PathBuf,
    pub url_prefix: String,
}

impl Default for LocalMediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            url_prefix: "/uploads".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default = "default_cloudinary_timeout")]
    pub timeout_secs: u64,
}

fn default_cloudinary_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    /// Cookie checked for a token before the `Authorization` header
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Where anonymous users are sent by logged-in-only routes
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

fn default_cookie_name() -> String {
    "token".into()
}

fn default_login_path() -> String {
    "/login".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=debug,sqlx=warn".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Reads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// Builds and validates a config from arbitrary sources.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if !self.auth.login_path.starts_with('/') {
            return Err(ConfigError::Invalid("auth.login_path must be an absolute path".into()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_upload_bytes must be positive".into()));
        }

        match (&self.media.backend, &self.media.cloudinary) {
            (MediaBackend::Cloudinary, None) => Err(ConfigError::Invalid(
                "media.backend = \"cloudinary\" requires a [media.cloudinary] section".into(),
            )),
            (MediaBackend::Local, _) if !self.media.local.url_prefix.starts_with('/') => Err(
                ConfigError::Invalid("media.local.url_prefix must be an absolute path".into()),
            ),
            _ => Ok(()),
        }
    }
}
