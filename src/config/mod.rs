//! Configuration module for the connector parity harness
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation, plus the runtime property
//! bag scenario steps share.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores. Lowercase placeholders are
/// left alone; those belong to the fixture property syntax.
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}").unwrap();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let full_match = cap.get(0).unwrap();
        let var_name = cap.get(1).unwrap().as_str();

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                if let Some(default) = cap.get(2) {
                    default.as_str().to_string()
                } else {
                    // No env var and no default. Keep the original placeholder.
                    full_match.as_str().to_string()
                }
            }
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main harness configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub proxy: ProxyConfig,
    pub dropbox: DropboxConfig,
    #[serde(default)]
    pub data: TestDataConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: String,
}

fn default_fixtures_dir() -> String {
    "fixtures".to_string()
}

impl HarnessConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_http_url(&self.proxy.url) {
            return Err(ConfigError::ValidationError(
                "Invalid proxy URL: must start with http:// or https://".into(),
            ));
        }

        if !is_valid_http_url(&self.dropbox.api_url) {
            return Err(ConfigError::ValidationError(
                "Invalid Dropbox API URL: must start with http:// or https://".into(),
            ));
        }

        if !is_valid_http_url(&self.dropbox.content_api_url) {
            return Err(ConfigError::ValidationError(
                "Invalid Dropbox content API URL: must start with http:// or https://".into(),
            ));
        }

        if self.dropbox.access_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Dropbox access token cannot be empty".into(),
            ));
        }

        if self.data.folder_name_1 == self.data.folder_name_2 {
            return Err(ConfigError::ValidationError(
                "folder_name_1 and folder_name_2 must differ".into(),
            ));
        }

        Ok(())
    }

    /// Seed a property bag with every configuration value scenario fixtures
    /// reference by name.
    pub fn seed_properties(&self) -> PropertyBag {
        let bag = PropertyBag::new();
        bag.set("proxy_url", &self.proxy.url);
        bag.set("api_url", &self.dropbox.api_url);
        bag.set("content_api_url", &self.dropbox.content_api_url);
        bag.set("api_version", &self.dropbox.api_version);
        bag.set("access_token", &self.dropbox.access_token);
        bag.set("folder_name_1", &self.data.folder_name_1);
        bag.set("folder_name_2", &self.data.folder_name_2);
        bag.set("file_name", &self.data.file_name);
        bag.set("upload_source_path", &self.data.upload_source_path);
        bag.set("write_mode", &self.data.write_mode);
        bag.set("mute", self.data.mute.to_string());
        bag
    }
}

/// ESB proxy endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
}

/// Dropbox API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxConfig {
    pub api_url: String,
    pub content_api_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    pub access_token: String,
}

fn default_api_version() -> String {
    "2".to_string()
}

/// Names of the folders and files the scenario chain creates and mutates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDataConfig {
    #[serde(default = "default_folder_name_1")]
    pub folder_name_1: String,
    #[serde(default = "default_folder_name_2")]
    pub folder_name_2: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_upload_source_path")]
    pub upload_source_path: String,
    #[serde(default = "default_write_mode")]
    pub write_mode: String,
    #[serde(default)]
    pub mute: bool,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self {
            folder_name_1: default_folder_name_1(),
            folder_name_2: default_folder_name_2(),
            file_name: default_file_name(),
            upload_source_path: default_upload_source_path(),
            write_mode: default_write_mode(),
            mute: false,
        }
    }
}

fn default_folder_name_1() -> String {
    "/ConnectorFolderOne".to_string()
}

fn default_folder_name_2() -> String {
    "/ConnectorFolderTwo".to_string()
}

fn default_file_name() -> String {
    "connectorUpload.txt".to_string()
}

fn default_upload_source_path() -> String {
    "fixtures/upload/sample.txt".to_string()
}

fn default_write_mode() -> String {
    "add".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

// ============================================================================
// Property Bag
// ============================================================================

/// A property the scenario chain expected to find was never stashed.
#[derive(Error, Debug)]
#[error("Property '{0}' is not set")]
pub struct MissingProperty(pub String);

/// String-keyed property store shared across scenario steps.
///
/// Seeded once from [`HarnessConfig::seed_properties`]; steps stash values
/// (created path, shared URL, revision id) that later steps consume. The
/// runner executes steps strictly sequentially, so the lock only exists to
/// make the bag `Send + Sync`.
#[derive(Debug, Default)]
pub struct PropertyBag {
    inner: RwLock<HashMap<String, String>>,
}

impl PropertyBag {
    /// Create an empty property bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    /// Look up a property, failing if it was never set
    pub fn require(&self, key: &str) -> Result<String, MissingProperty> {
        self.get(key).ok_or_else(|| MissingProperty(key.to_string()))
    }

    /// Set or overwrite a property
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.inner.write().insert(key.to_string(), value.into());
    }

    /// Snapshot of all properties, for placeholder substitution
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> HarnessConfig {
        HarnessConfig {
            proxy: ProxyConfig {
                url: "http://localhost:8280/services/dropbox".into(),
            },
            dropbox: DropboxConfig {
                api_url: "https://api.dropboxapi.com".into(),
                content_api_url: "https://content.dropboxapi.com".into(),
                api_version: default_api_version(),
                access_token: "token".into(),
            },
            data: TestDataConfig::default(),
            http: HttpConfig::default(),
            fixtures_dir: default_fixtures_dir(),
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_proxy_url() {
        let mut config = base_config();
        config.proxy.url = "localhost:8280".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_token() {
        let mut config = base_config();
        config.dropbox.access_token = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_folder_names() {
        let mut config = base_config();
        config.data.folder_name_2 = config.data.folder_name_1.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_seed_properties() {
        let bag = base_config().seed_properties();
        assert_eq!(bag.require("api_version").unwrap(), "2");
        assert_eq!(bag.require("mute").unwrap(), "false");
        assert!(bag.get("shared_url").is_none());
    }

    #[test]
    fn test_property_bag_stash_and_require() {
        let bag = PropertyBag::new();
        bag.set("rev", "a1b2c3");
        assert_eq!(bag.require("rev").unwrap(), "a1b2c3");
        let err = bag.require("shared_url").unwrap_err();
        assert_eq!(err.to_string(), "Property 'shared_url' is not set");
    }

    #[test]
    fn test_expand_env_vars_leaves_lowercase_placeholders() {
        let expanded = expand_env_vars("${folder_name_1}/${file_name}");
        assert_eq!(expanded, "${folder_name_1}/${file_name}");
    }

    #[test]
    fn test_expand_env_vars_default_value() {
        let expanded = expand_env_vars("${THIS_VAR_DOES_NOT_EXIST_ANYWHERE:-fallback}");
        assert_eq!(expanded, "fallback");
    }
}
