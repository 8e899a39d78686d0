//! Configuration loader with environment variable expansion

use super::{expand_env_vars, ConfigError, HarnessConfig};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HarnessConfig, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: HarnessConfig = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const BASE_YAML: &str = r#"
proxy:
  url: "http://localhost:8280/services/dropbox"
dropbox:
  api_url: "https://api.dropboxapi.com"
  content_api_url: "https://content.dropboxapi.com"
  access_token: "${HARNESS_TEST_TOKEN:-fallback-token}"
"#;

    #[test]
    #[serial]
    fn test_load_expands_env_vars() {
        std::env::set_var("HARNESS_TEST_TOKEN", "env-token");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BASE_YAML.as_bytes()).unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.dropbox.access_token, "env-token");
        assert_eq!(config.dropbox.api_version, "2");
        std::env::remove_var("HARNESS_TEST_TOKEN");
    }

    #[test]
    #[serial]
    fn test_load_uses_default_when_env_missing() {
        std::env::remove_var("HARNESS_TEST_TOKEN");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BASE_YAML.as_bytes()).unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.dropbox.access_token, "fallback-token");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = ConfigLoader::load("does-not-exist.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
