//! Gateway configuration.
//!
//! Sources are merged in this order (later sources override earlier):
//! 1. Default values (`GatewayConfig::default()`)
//! 2. TOML configuration file (if it exists)
//! 3. Environment variables prefixed with `GATEHOUSE_`, nested with `__`
//!    (e.g. `GATEHOUSE_SERVER__PORT=9000`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderValue;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use thiserror::Error;

use gatehouse_auth::{CredentialStore, CredentialStoreError, Role, Secret, User, basic_challenge};
use gatehouse_observability::LogSettings;

pub const CONFIG_ENV_PREFIX: &str = "GATEHOUSE_";
pub const CONFIG_PATH_ENV: &str = "GATEHOUSE_CONFIG";
pub const DEFAULT_CONFIG_FILENAME: &str = "gatehouse.toml";

const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Port to listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSetting {
    /// Let the OS pick a free port; read it back after binding.
    Ephemeral,
    Fixed(u16),
}

impl PortSetting {
    /// Port number handed to `bind` (`0` asks the OS for one).
    pub fn bind_port(self) -> u16 {
        match self {
            Self::Ephemeral => 0,
            Self::Fixed(port) => port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Absent or `0` means ephemeral.
    pub port: Option<u16>,
    pub startup_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    /// Stop automatically after this long; absent means run until stopped.
    pub run_duration_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            run_duration_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn port_setting(&self) -> PortSetting {
        match self.port {
            None | Some(0) => PortSetting::Ephemeral,
            Some(port) => PortSetting::Fixed(port),
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Body returned by the public `/` route.
    pub greeting: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            greeting: "Greetings from the web server!".to_string(),
        }
    }
}

/// One configured user. Field order mirrors the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub login: String,
    pub password: Secret,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl UserConfig {
    pub fn new(
        login: impl Into<String>,
        password: impl Into<Secret>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            roles: roles.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub realm: String,
    pub users: Vec<UserConfig>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            realm: "gatehouse".to_string(),
            users: Vec::new(),
        }
    }
}

impl SecuritySettings {
    /// Build the credential store from the configured user list.
    pub fn credential_store(&self) -> Result<CredentialStore, CredentialStoreError> {
        CredentialStore::from_users(self.users.iter().map(|u| {
            User::new(u.login.clone(), u.password.clone(), u.roles.iter().cloned())
        }))
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub app: AppSettings,
    pub security: SecuritySettings,
    pub log: LogSettings,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.realm.trim().is_empty() {
            return Err(ConfigError::Invalid("security.realm must not be empty".to_string()));
        }
        if HeaderValue::from_str(&basic_challenge(&self.security.realm)).is_err() {
            return Err(ConfigError::Invalid(
                "security.realm must not contain control characters".to_string(),
            ));
        }
        if self.server.startup_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.startup_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.shutdown_grace_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.shutdown_grace_secs must be greater than zero".to_string(),
            ));
        }
        if self.security.users.iter().any(|u| u.login.is_empty()) {
            return Err(ConfigError::Invalid("security.users[].login must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// File consulted by [`ConfigLoader::load`]: explicit path, then
    /// `GATEHOUSE_CONFIG`, then `gatehouse.toml` in the working directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME))
    }

    pub fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let path = self.resolved_path();
        let mut figment = Figment::new();

        if path.exists() {
            figment = figment.merge(Toml::file(&path));
            tracing::info!(path = %path.display(), "configuration file loaded");
        } else {
            tracing::warn!(path = %path.display(), "configuration file not found; using defaults");
        }

        figment = figment.merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"));

        let config: GatewayConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }
}
