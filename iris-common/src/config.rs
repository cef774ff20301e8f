//! Configuration loading
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`IRIS_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults are
//! used. A TOML file that exists but does not parse is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::ContentType;
use crate::{Error, Result};

/// Config file name looked up under the platform config directory
pub const CONFIG_FILE_NAME: &str = "iris-api.toml";

/// Full server configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IrisConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limits: RateLimitConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS (the web front end)
    pub cors_origins: Vec<String>,
    /// Largest accepted analysis upload
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_upload_mb: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Wrong passwords before the account is locked
    pub max_failed_attempts: u32,
    pub lockout_minutes: i64,
    /// How long a password-verified login may wait for its OTP
    pub otp_validity_minutes: i64,
    /// TOTP steps accepted either side of the current one
    pub otp_skew_steps: u8,
    /// Issuer shown by authenticator apps
    pub otp_issuer: String,
    /// When false, a correct password logs the user in directly
    pub require_otp: bool,
    /// Bearer token lifetime
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_minutes: 15,
            otp_validity_minutes: 10,
            otp_skew_steps: 1,
            otp_issuer: "IrisApp".to_string(),
            require_otp: true,
            session_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub register_per_minute: u32,
    pub login_per_minute: u32,
    /// Authenticator code guesses per client
    pub verify_otp_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            register_per_minute: 5,
            login_per_minute: 10,
            verify_otp_per_minute: 10,
        }
    }
}

/// Where analysis requests are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    /// Deterministic built-in responses (demo deployments, tests)
    #[default]
    Mock,
    /// Relay to the configured ML endpoints
    Remote,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceEndpoints {
    pub image: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub text: Option<String>,
}

impl InferenceEndpoints {
    pub fn for_type(&self, content_type: ContentType) -> Option<&str> {
        match content_type {
            ContentType::Image => self.image.as_deref(),
            ContentType::Audio => self.audio.as_deref(),
            ContentType::Video => self.video.as_deref(),
            ContentType::Text => self.text.as_deref(),
        }
    }

    fn is_empty(&self) -> bool {
        ContentType::ALL.iter().all(|t| self.for_type(*t).is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub mode: InferenceMode,
    pub timeout_secs: u64,
    pub endpoints: InferenceEndpoints,
    /// Narrative interpretation service; local templates are used when unset
    pub interpretation_url: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Mock,
            timeout_secs: 30,
            endpoints: InferenceEndpoints::default(),
            interpretation_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl IrisConfig {
    /// Load configuration from TOML (explicit path or platform default),
    /// then apply environment overrides and validate
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    warn!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
                None => {
                    warn!("Could not determine config directory, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing sections take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: IrisConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `IRIS_*` environment variables over file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("IRIS_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IRIS_PORT {:?}: {}", port, e)))?;
        }
        if let Ok(host) = std::env::var("IRIS_HOST") {
            self.server.host = host;
        }
        if let Ok(path) = std::env::var("IRIS_DATABASE") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("IRIS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(mode) = std::env::var("IRIS_INFERENCE_MODE") {
            self.inference.mode = match mode.trim().to_ascii_lowercase().as_str() {
                "mock" => InferenceMode::Mock,
                "remote" => InferenceMode::Remote,
                other => {
                    return Err(Error::Config(format!(
                        "Invalid IRIS_INFERENCE_MODE {:?} (expected mock or remote)",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.max_failed_attempts == 0 {
            return Err(Error::Config(
                "auth.max_failed_attempts must be at least 1".to_string(),
            ));
        }
        if self.auth.lockout_minutes <= 0
            || self.auth.otp_validity_minutes <= 0
            || self.auth.session_ttl_hours <= 0
        {
            return Err(Error::Config(
                "auth.lockout_minutes, auth.otp_validity_minutes and auth.session_ttl_hours must be positive"
                    .to_string(),
            ));
        }
        if self.server.max_upload_mb == 0 {
            return Err(Error::Config("server.max_upload_mb must be at least 1".to_string()));
        }
        if self.inference.mode == InferenceMode::Remote && self.inference.endpoints.is_empty() {
            return Err(Error::Config(
                "inference.mode = \"remote\" needs at least one inference.endpoints entry"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `<config_dir>/iris/iris-api.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("iris").join(CONFIG_FILE_NAME))
}

/// `<data_local_dir>/iris/iris.db`, falling back to the working directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("iris"))
        .unwrap_or_else(|| PathBuf::from("./iris_data"))
        .join("iris.db")
}
