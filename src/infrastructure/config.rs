use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::application::session::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS};
use crate::application::PollPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";
pub const API_KEY_VAR: &str = "GENAI_API_KEY";
/// Largest page the vendor accepts for document listings.
pub const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub backend: Backend,
    pub gemini: GeminiConfig,
    pub cache: CacheConfig,
    pub pagination: PaginationConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gemini,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid(format!("unknown backend {other}"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub poll_interval_seconds: u64,
    /// 0 disables the bound.
    pub poll_timeout_seconds: u64,
    pub staging_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 2,
            poll_timeout_seconds: 600,
            staging_dir: None,
        }
    }
}

impl UploadConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        let timeout = (self.poll_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.poll_timeout_seconds));
        PollPolicy::new(Duration::from_secs(self.poll_interval_seconds), timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_seconds: u64,
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT.as_secs(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }
}

/// Loaded configuration plus the API credential.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    api_key: Option<String>,
}

impl AppConfig {
    /// Reads `APP_CONFIG` (or `config/app.yaml` when present), applies
    /// environment overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("APP_CONFIG").ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let config = if explicit.is_some() || path.exists() {
            Self::read_file(&path)?
        } else {
            Config::default()
        };

        Self::from_parts(config, |key| std::env::var(key).ok())
    }

    pub fn from_parts(
        mut config: Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = env("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = env("SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SERVER_PORT={port}")))?;
        }
        if let Some(backend) = env("FILE_SEARCH_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(model) = env("GEMINI_MODEL") {
            config.gemini.model = model;
        }

        let app = Self {
            config,
            api_key: env(API_KEY_VAR).filter(|k| !k.trim().is_empty()),
        };
        app.validate()?;
        Ok(app)
    }

    pub fn from_yaml(yaml: &str) -> Result<Config, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn read_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.config;
        if c.pagination.page_size == 0 || c.pagination.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "pagination.page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        if c.upload.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "upload.poll_interval_seconds must be positive".into(),
            ));
        }
        if c.session.idle_timeout_seconds == 0 || c.session.max_sessions == 0 {
            return Err(ConfigError::Invalid(
                "session.idle_timeout_seconds and session.max_sessions must be positive".into(),
            ));
        }
        if c.backend == Backend::Gemini && self.api_key.is_none() {
            return Err(ConfigError::MissingCredential(API_KEY_VAR));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_fatal_for_gemini() {
        let err = AppConfig::from_parts(Config::default(), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(API_KEY_VAR)));
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let err = AppConfig::from_parts(Config::default(), env(&[(API_KEY_VAR, "  ")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_memory_backend_needs_no_key() {
        let app =
            AppConfig::from_parts(Config::default(), env(&[("FILE_SEARCH_BACKEND", "memory")]))
                .unwrap();
        assert_eq!(app.config.backend, Backend::Memory);
        assert!(app.api_key().is_err());
    }

    #[test]
    fn test_yaml_with_env_overrides() {
        let config = AppConfig::from_yaml(
            "gemini:\n  model: gemini-2.5-pro\ncache:\n  ttl_seconds: 30\nupload:\n  poll_interval_seconds: 5\n",
        )
        .unwrap();
        let app = AppConfig::from_parts(
            config,
            env(&[(API_KEY_VAR, "secret"), ("SERVER_PORT", "9090")]),
        )
        .unwrap();

        assert_eq!(app.config.gemini.model, "gemini-2.5-pro");
        assert_eq!(app.cache_ttl(), Duration::from_secs(30));
        assert_eq!(app.config.server.port, 9090);
        assert_eq!(app.config.pagination.page_size, MAX_PAGE_SIZE);
        assert_eq!(
            app.config.upload.poll_policy().interval,
            Duration::from_secs(5)
        );
        assert_eq!(app.api_key().unwrap(), "secret");
    }

    #[test]
    fn test_page_size_out_of_range() {
        let config = AppConfig::from_yaml("pagination:\n  page_size: 50\n").unwrap();
        let err = AppConfig::from_parts(config, env(&[(API_KEY_VAR, "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_session_limits() {
        let config = AppConfig::from_yaml(
            "backend: memory\nsession:\n  idle_timeout_seconds: 120\n  max_sessions: 50\n",
        )
        .unwrap();
        let app = AppConfig::from_parts(config, env(&[])).unwrap();
        assert_eq!(app.config.session.idle_timeout(), Duration::from_secs(120));
        assert_eq!(app.config.session.max_sessions, 50);

        let config = AppConfig::from_yaml("backend: memory\nsession:\n  max_sessions: 0\n").unwrap();
        assert!(matches!(
            AppConfig::from_parts(config, env(&[])),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let upload = UploadConfig {
            poll_timeout_seconds: 0,
            ..UploadConfig::default()
        };
        assert_eq!(upload.poll_policy().timeout, None);
    }
}
