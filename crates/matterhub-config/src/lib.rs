//! Application configuration for matterhub.
//!
//! TOML file + `MATTERHUB_` environment layering, access-token resolution
//! (env + keyring + plaintext), and the storage location the bridge
//! store lives in.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Keyring service name the access token is stored under.
pub const KEYRING_SERVICE: &str = "matterhub";
/// Keyring entry holding the hub access token.
pub const KEYRING_TOKEN_ENTRY: &str = "home-assistant/access-token";

const ENV_PREFIX: &str = "MATTERHUB_";
const DEFAULT_STORAGE_DIR: &str = ".home-assistant-matter-hub";
const LOG_LEVELS: &[&str] = &["silly", "trace", "debug", "info", "warn", "error"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no Home Assistant access token configured")]
    NoAccessToken,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub home_assistant: HomeAssistant,

    /// Directory holding all persisted state. `~/` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub disable_log_colors: bool,

    /// Port of the management API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Network interface mDNS announcements are limited to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdns_network_interface: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_assistant: HomeAssistant::default(),
            storage_location: None,
            log_level: default_log_level(),
            disable_log_colors: false,
            http_port: default_http_port(),
            mdns_network_interface: None,
        }
    }
}

/// Connection to the Home Assistant instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HomeAssistant {
    #[serde(default = "default_url")]
    pub url: String,

    /// Long-lived access token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Environment variable name containing the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
}

impl Default for HomeAssistant {
    fn default() -> Self {
        Self {
            url: default_url(),
            access_token: None,
            access_token_env: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_http_port() -> u16 {
    8482
}
fn default_url() -> String {
    "http://homeassistant.local:8123".into()
}

impl Config {
    /// Check values figment cannot check by type alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.home_assistant_url()?;
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Validation {
                field: "log_level".into(),
                reason: format!("expected one of {}, got '{}'", LOG_LEVELS.join(", "), self.log_level),
            });
        }
        if self.http_port == 0 {
            return Err(ConfigError::Validation {
                field: "http_port".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn home_assistant_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .home_assistant
            .url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "home_assistant.url".into(),
                reason: format!("invalid URL: {}", self.home_assistant.url),
            })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "home_assistant.url".into(),
                reason: format!("expected an http(s) URL, got scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Resolved storage directory.
    pub fn storage_path(&self) -> PathBuf {
        let home = home_dir();
        match self.storage_location.as_deref() {
            Some(location) => expand_home(location, &home),
            None => home.join(DEFAULT_STORAGE_DIR),
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "matterhub", "matterhub").map_or_else(
        || home_dir().join(".config").join("matterhub").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn home_dir() -> PathBuf {
    BaseDirs::new().map_or_else(
        || PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into())),
        |dirs| dirs.home_dir().to_path_buf(),
    )
}

fn expand_home(location: &str, home: &Path) -> PathBuf {
    match location.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None if location == "~" => home.to_path_buf(),
        None => PathBuf::from(location),
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then `path` (if present), then `MATTERHUB_*` variables.
///
/// Nested keys use a double underscore: `MATTERHUB_HOME_ASSISTANT__URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the Home Assistant access token: env var, then keyring, then
/// plaintext in config.
pub fn resolve_access_token(config: &Config) -> Result<SecretString, ConfigError> {
    let ha = &config.home_assistant;

    // 1. Configured env var
    if let Some(ref env_name) = ha.access_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_ENTRY) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = ha.access_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoAccessToken)
}

/// Store the access token in the system keyring.
pub fn store_access_token(token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_TOKEN_ENTRY).map_err(|e| {
        ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        }
    })?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.http_port, 8482);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\nstorage_location = \"/srv/hub\"\n\n[home_assistant]\nurl = \"https://ha.example:8123\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.storage_path(), PathBuf::from("/srv/hub"));
        assert_eq!(config.home_assistant_url().unwrap().host_str(), Some("ha.example"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"loud\"\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Validation { .. })
        ));

        let mut config = Config::default();
        config.home_assistant.url = "ftp://ha".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            storage_location: Some("~/hub".into()),
            mdns_network_interface: Some("eth0".into()),
            ..Config::default()
        };
        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn home_prefix_is_expanded() {
        let home = Path::new("/home/hub");
        assert_eq!(expand_home("~/data", home), PathBuf::from("/home/hub/data"));
        assert_eq!(expand_home("~", home), PathBuf::from("/home/hub"));
        assert_eq!(expand_home("/var/lib/hub", home), PathBuf::from("/var/lib/hub"));
        assert!(Config::default().storage_path().ends_with(DEFAULT_STORAGE_DIR));
    }

    #[test]
    fn plaintext_token_is_the_last_resort() {
        let mut config = Config::default();
        config.home_assistant.access_token = Some("plain".into());
        config.home_assistant.access_token_env = Some("MATTERHUB_TEST_UNSET_TOKEN_VAR".into());
        // A token stored in the keyring of the test machine takes precedence.
        let token = resolve_access_token(&config).unwrap();
        assert!(!token.expose_secret().is_empty());
    }
}
