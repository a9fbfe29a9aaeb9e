//! Server configuration.
//!
//! The configuration is read from a TOML file, `conf/passport.toml` by default, or the path given in
//! `PASSPORT_CONFIG_FILE`. A handful of environment variables override the file so that deployments can inject
//! endpoints and secrets without editing it:
//!
//! * `PASSPORT_HOST`, `PASSPORT_PORT`
//! * `PASSPORT_DATABASE_URL`
//! * `PASSPORT_REDIS_URL` (`memory://` selects the in-process cache)
//! * `PASSPORT_INNER_TOKEN`
//! * `PASSPORT_RUN_MIGRATIONS`
use std::{env, fs, path::Path, time::Duration};

use log::*;
use passport_common::{helpers::parse_boolean_flag, Secret};
use passport_engine::{helpers::RetryPolicy, ShardConfig};
use serde::Deserialize;

use crate::errors::ServerError;

pub const DEFAULT_CONFIG_FILE: &str = "conf/passport.toml";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/passport.db";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub tenant_databases: Vec<ShardConfig>,
    pub cache: CacheConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Debug,
    Release,
}

impl RunMode {
    pub fn default_log_level(&self) -> LevelFilter {
        match self {
            RunMode::Debug => LevelFilter::Debug,
            RunMode::Release => LevelFilter::Info,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub run_mode: RunMode,
    pub host: String,
    pub http_port: u16,
    /// Seconds a client may take to send the request head.
    pub read_timeout: u64,
    /// Seconds the server waits for a client to acknowledge the end of a response before dropping the connection.
    pub write_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_PORT,
            read_timeout: 60,
            write_timeout: 60,
        }
    }
}

impl HttpConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    /// Shared secret that internal services present in the `X-Token` header.
    pub inner_token: Secret<String>,
    pub page_size: u32,
    /// When set, logs are written to `<log_save_path>/<name>.<log_file_ext>` instead of stderr.
    pub log_save_path: Option<String>,
    pub log_file_ext: String,
    /// Avatars hosted on this domain were uploaded by the user and are kept on WeChat login.
    pub oss_domain: String,
    pub run_migrations: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "passport".to_string(),
            inner_token: Secret::default(),
            page_size: 20,
            log_save_path: None,
            log_file_ext: "log".to_string(),
            oss_domain: String::default(),
            run_migrations: false,
        }
    }
}

impl AppConfig {
    pub fn log_file(&self) -> Option<String> {
        let dir = self.log_save_path.as_ref()?;
        Some(format!("{}/{}.{}", dir.trim_end_matches('/'), self.name, self.log_file_ext))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: DEFAULT_DATABASE_URL.to_string(), max_connections: 25 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub url: String,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub retry_jitter_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { url: DEFAULT_REDIS_URL.to_string(), retry_attempts: 3, retry_backoff_ms: 20, retry_jitter_ms: 10 }
    }
}

impl CacheConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts.max(1))
            .with_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_jitter(Duration::from_millis(self.retry_jitter_ms))
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ServerError> {
        toml::from_str(s).map_err(|e| ServerError::ConfigurationError(e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ServerError::ConfigurationError(format!("Could not read {}. {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Loads the configuration file (falling back to defaults if it cannot be read) and applies the environment
    /// overrides.
    pub fn from_env_or_default() -> Self {
        let path = env::var("PASSPORT_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(&path).unwrap_or_else(|e| {
            warn!("🪛️ {e} Using the default configuration instead.");
            Self::default()
        });
        config.apply_env_overrides(|key| env::var(key).ok());
        config
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value. Invalid values are logged and ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where F: Fn(&str) -> Option<String> {
        if let Some(host) = lookup("PASSPORT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PASSPORT_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.http_port = p,
                Err(e) => warn!(
                    "🪛️ {port} is not a valid port for PASSPORT_PORT. {e} Keeping {} instead.",
                    self.server.http_port
                ),
            }
        }
        if let Some(url) = lookup("PASSPORT_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(url) = lookup("PASSPORT_REDIS_URL") {
            self.cache.url = url;
        }
        if let Some(token) = lookup("PASSPORT_INNER_TOKEN") {
            self.app.inner_token = Secret::new(token);
        }
        self.app.run_migrations = parse_boolean_flag(lookup("PASSPORT_RUN_MIGRATIONS"), self.app.run_migrations);
        if self.app.inner_token.reveal().is_empty() {
            warn!("🪛️ No inner token is configured. Internal endpoints will reject every request.");
        }
    }
}
