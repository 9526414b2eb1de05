//! services/shell/src/config.rs
//!
//! Defines the host's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::Level;
use url::Url;
use webshell_core::bootstrap::{BiometricPolicy, BootstrapConfig};
use webshell_core::domain::{BiometricKind, BiometricOutcome, PermissionStatus};
use webshell_core::navigation::DEFAULT_EXTERNAL_PATTERNS;

pub const DEFAULT_WEB_BASE_URL: &str = "http://1.234.44.179:3004";
pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub web_base_url: String,
    pub api_base_url: String,
    pub login_path: String,
    pub external_patterns: Vec<String>,
    /// Delay before the load-end resync.
    pub auto_save_delay: Duration,
    /// Carried for parity with the web app; no timer uses it.
    pub message_timeout: Duration,
    pub biometric_policy: BiometricPolicy,
    pub biometric_kinds: Vec<BiometricKind>,
    pub biometric_outcome: BiometricOutcome,
    pub device_push_token: Option<String>,
    pub expo_push_url: String,
    pub camera_permission: PermissionStatus,
    pub gallery_permission: PermissionStatus,
    pub push_registration: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Server, database and logging ---
        let bind_address = parse("BIND_ADDRESS", &var("BIND_ADDRESS", "127.0.0.1:3030"))?;
        let database_url = var("DATABASE_URL", "sqlite://webshell.db?mode=rwc");

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Web application ---
        let web_base_url = base_url("WEB_BASE_URL", &var("WEB_BASE_URL", DEFAULT_WEB_BASE_URL))?;
        let api_base_url = match lookup("API_BASE_URL") {
            Some(raw) => base_url("API_BASE_URL", &raw)?,
            None => web_base_url.clone(),
        };
        let login_path = var("LOGIN_PATH", "/login");

        let external_patterns = match lookup("EXTERNAL_DOMAINS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_EXTERNAL_PATTERNS.iter().map(|p| p.to_string()).collect(),
        };

        let auto_save_delay = millis("AUTO_SAVE_DELAY_MS", &var("AUTO_SAVE_DELAY_MS", "500"))?;
        let message_timeout = millis("MESSAGE_TIMEOUT_MS", &var("MESSAGE_TIMEOUT_MS", "3000"))?;

        // --- Device ---
        let biometric_policy =
            var("BIOMETRIC_POLICY", "advisory")
                .parse::<BiometricPolicy>()
                .map_err(|e| ConfigError::InvalidValue("BIOMETRIC_POLICY".to_string(), e))?;
        let biometric_kinds = split_list(&var("BIOMETRIC_KINDS", ""))
            .iter()
            .map(|k| biometric_kind(k))
            .collect::<Result<Vec<_>, _>>()?;
        let biometric_outcome = biometric_outcome(&var("BIOMETRIC_OUTCOME", "success"))?;

        let camera_permission = permission("CAMERA_PERMISSION", &var("CAMERA_PERMISSION", "granted"))?;
        let gallery_permission =
            permission("GALLERY_PERMISSION", &var("GALLERY_PERMISSION", "granted"))?;

        // --- Push ---
        let device_push_token = lookup("DEVICE_PUSH_TOKEN").filter(|t| !t.is_empty());
        let expo_push_url = var("EXPO_PUSH_URL", DEFAULT_EXPO_PUSH_URL);
        Url::parse(&expo_push_url)
            .map_err(|e| ConfigError::InvalidValue("EXPO_PUSH_URL".to_string(), e.to_string()))?;
        let push_registration = parse("PUSH_REGISTRATION", &var("PUSH_REGISTRATION", "true"))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            web_base_url,
            api_base_url,
            login_path,
            external_patterns,
            auto_save_delay,
            message_timeout,
            biometric_policy,
            biometric_kinds,
            biometric_outcome,
            device_push_token,
            expo_push_url,
            camera_permission,
            gallery_permission,
            push_registration,
        })
    }

    pub fn bootstrap(&self) -> BootstrapConfig {
        let mut config = BootstrapConfig::with_default_tabs(self.web_base_url.clone());
        config.login_path = self.login_path.clone();
        config.biometric_policy = self.biometric_policy;
        config
    }

    pub fn native_token_endpoint(&self) -> String {
        format!("{}/api/users/native-token", self.api_base_url)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(key, raw).map(Duration::from_millis)
}

/// Validates the locator and strips the trailing slash.
fn base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn permission(key: &str, raw: &str) -> Result<PermissionStatus, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "granted" => Ok(PermissionStatus::Granted),
        "denied" => Ok(PermissionStatus::Denied),
        "undetermined" => Ok(PermissionStatus::Undetermined),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{other}' is not granted, denied or undetermined"),
        )),
    }
}

fn biometric_kind(raw: &str) -> Result<BiometricKind, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "fingerprint" => Ok(BiometricKind::Fingerprint),
        "face" | "facial_recognition" => Ok(BiometricKind::FacialRecognition),
        "iris" => Ok(BiometricKind::Iris),
        other => Err(ConfigError::InvalidValue(
            "BIOMETRIC_KINDS".to_string(),
            format!("unknown biometric kind '{other}'"),
        )),
    }
}

fn biometric_outcome(raw: &str) -> Result<BiometricOutcome, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "success" => Ok(BiometricOutcome::Success),
        "cancelled" => Ok(BiometricOutcome::Cancelled),
        "failed" => Ok(BiometricOutcome::Failed {
            reason: "rejected by host configuration".to_string(),
        }),
        other => Err(ConfigError::InvalidValue(
            "BIOMETRIC_OUTCOME".to_string(),
            format!("unknown outcome '{other}'"),
        )),
    }
}
