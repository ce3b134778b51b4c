//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root every resource path is relative to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    /// Config pointing at a custom API root
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the tokens and cached profile
    #[serde(default = "default_session_file")]
    pub file: String,
}

fn default_session_file() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("cmms").join("session.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./cmms_session.json".to_string())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
        }
    }
}

/// Dashboard data source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Simulated latency of the fixture source
    #[serde(default = "default_fixture_latency")]
    pub fixture_latency_ms: u64,
}

fn default_fixture_latency() -> u64 {
    500
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fixture_latency_ms: default_fixture_latency(),
        }
    }
}

/// Development proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_listen")]
    pub listen: String,

    /// Backend origin that receives `/api/*`
    #[serde(default = "default_proxy_target")]
    pub target: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_proxy_listen() -> String {
    "127.0.0.1:5173".to_string()
}

fn default_proxy_target() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_proxy_listen(),
            target: default_proxy_target(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber
    ///
    /// `RUST_LOG` wins over the configured level.
    pub fn init(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cmms={},tower_http=info", self.level)));

        let registry = tracing_subscriber::registry().with(filter);
        let result = if self.format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };

        if let Err(e) = result {
            eprintln!("Logging already initialized: {}", e);
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("cmms").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(url) = lookup("CMMS_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = lookup("CMMS_API_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.api.timeout_secs = t;
            }
        }

        // Session overrides
        if let Some(file) = lookup("CMMS_SESSION_FILE") {
            self.session.file = file;
        }

        // Proxy overrides
        if let Some(listen) = lookup("CMMS_PROXY_LISTEN") {
            self.proxy.listen = listen;
        }
        if let Some(target) = lookup("CMMS_PROXY_TARGET") {
            self.proxy.target = target;
        }

        // Logging overrides
        if let Some(level) = lookup("CMMS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CMMS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# CMMS Client Configuration
#
# Environment variables override these settings:
# - CMMS_API_URL
# - CMMS_API_TIMEOUT_SECS
# - CMMS_SESSION_FILE
# - CMMS_PROXY_LISTEN
# - CMMS_PROXY_TARGET
# - CMMS_LOG_LEVEL
# - CMMS_LOG_FORMAT

[api]
# API root; resource paths such as /tickets/ are relative to it
base_url = "http://localhost:8000/api"

# Request timeout in seconds
timeout_secs = 30

[session]
# File holding the access token, refresh token and cached profile (clear text)
file = "~/.local/share/cmms/session.json"

[dashboard]
# Simulated latency of the built-in dashboard fixtures (ms)
fixture_latency_ms = 500

[proxy]
# Address the development proxy listens on
listen = "127.0.0.1:5173"

# Backend origin receiving /api/* requests
target = "http://localhost:8000"

# Upstream timeout in seconds
timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
