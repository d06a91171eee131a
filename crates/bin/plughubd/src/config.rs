//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `plughub.toml` in the working directory, or at the path given by
//! `PLUGHUB_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use plughub_adapter_remote_http::RemoteHttpConfig;
use plughub_app::rule_scheduler::SchedulerConfig;
use plughub_app::state_cache::CacheConfig;
use plughub_domain::device::Device;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Device controller connection.
    pub remote: RemoteConfig,
    /// State cache timing.
    pub cache: CacheSection,
    /// Rule scheduler timing.
    pub scheduler: SchedulerSection,
    /// API authentication.
    pub auth: AuthConfig,
    /// Devices to seed the store with at startup.
    pub devices: Vec<DeviceConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Which device controller to talk to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Built-in simulated controller.
    #[default]
    Virtual,
    /// Real controller over HTTPS.
    Http,
}

/// Device controller configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub mode: RemoteMode,
    /// Controller base URL, required in `http` mode.
    pub url: Option<String>,
    /// API key presented to the controller.
    pub key: String,
    /// Accept self-signed controller certificates.
    pub accept_invalid_certs: bool,
}

/// State cache timing, in milliseconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub refresh_period_ms: u64,
    pub get_timeout_ms: u64,
    pub set_timeout_ms: u64,
}

/// Rule scheduler timing, in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub tick_period_secs: u64,
    pub max_age_secs: u64,
}

/// API authentication configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key required on `/api` routes; the API is open when unset.
    pub api_key: Option<String>,
}

/// A `[[devices]]` entry.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Config {
    /// Load configuration from `plughub.toml` (or `$PLUGHUB_CONFIG`, if set)
    /// then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PLUGHUB_CONFIG").unwrap_or_else(|_| "plughub.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("PLUGHUB_HOST") {
            self.server.host = val;
        }
        if let Some(val) = var("PLUGHUB_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("PLUGHUB_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = var("PLUGHUB_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("PLUGHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("PLUGHUB_REMOTE_URL") {
            self.remote.url = Some(val);
            self.remote.mode = RemoteMode::Http;
        }
        if let Some(val) = var("PLUGHUB_REMOTE_KEY") {
            self.remote.key = val;
        }
        if let Some(val) = var("PLUGHUB_API_KEY") {
            self.auth.api_key = Some(val);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.remote.mode == RemoteMode::Http && self.remote.url.is_none() {
            return Err(ConfigError::Validation(
                "remote.url is required in http mode".to_string(),
            ));
        }
        if self.cache.refresh_period_ms == 0 || self.scheduler.tick_period_secs == 0 {
            return Err(ConfigError::Validation(
                "refresh and tick periods must be non-zero".to_string(),
            ));
        }
        if self.auth.api_key.as_deref() == Some("") {
            return Err(ConfigError::Validation(
                "auth.api_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            refresh_period: Duration::from_millis(self.cache.refresh_period_ms),
            get_timeout: Duration::from_millis(self.cache.get_timeout_ms),
            set_timeout: Duration::from_millis(self.cache.set_timeout_ms),
        }
    }

    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_period: Duration::from_secs(self.scheduler.tick_period_secs),
            max_age: Duration::from_secs(self.scheduler.max_age_secs),
        }
    }

    /// Controller settings when running in `http` mode.
    #[must_use]
    pub fn remote_http_config(&self) -> Option<RemoteHttpConfig> {
        match self.remote.mode {
            RemoteMode::Virtual => None,
            RemoteMode::Http => self.remote.url.as_ref().map(|url| RemoteHttpConfig {
                url: url.clone(),
                key: self.remote.key.clone(),
                accept_invalid_certs: self.remote.accept_invalid_certs,
            }),
        }
    }

    /// Devices listed in the file, in order.
    #[must_use]
    pub fn seed_devices(&self) -> Vec<Device> {
        self.devices
            .iter()
            .map(|device| Device::new(device.id.as_str(), device.name.as_str(), device.kind.as_str()))
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:plughub.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "plughubd=info,plughub=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            refresh_period_ms: millis(defaults.refresh_period),
            get_timeout_ms: millis(defaults.get_timeout),
            set_timeout_ms: millis(defaults.set_timeout),
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            tick_period_secs: defaults.tick_period.as_secs(),
            max_age_secs: defaults.max_age.as_secs(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
