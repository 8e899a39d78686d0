//! Shared test infrastructure
//!
//! Builds harness contexts pointed at a wiremock server that stands in for
//! both the ESB proxy and the Dropbox API. The repo's real fixture templates
//! under `fixtures/` are used as-is.

use dropbox_connector_harness::config::{
    DropboxConfig, HarnessConfig, HttpConfig, ProxyConfig, TestDataConfig,
};
use dropbox_connector_harness::scenarios::HarnessContext;

/// Access token the mock configuration carries
pub const TEST_TOKEN: &str = "test-access-token";

/// Proxy service path on the mock server
pub const PROXY_PATH: &str = "/services/dropbox";

/// Absolute path to the repo's fixture directory
pub fn fixtures_dir() -> String {
    format!("{}/fixtures", env!("CARGO_MANIFEST_DIR"))
}

/// Harness configuration with every endpoint pointed at `mock_uri`
pub fn mock_config(mock_uri: &str) -> HarnessConfig {
    HarnessConfig {
        proxy: ProxyConfig {
            url: format!("{mock_uri}{PROXY_PATH}"),
        },
        dropbox: DropboxConfig {
            api_url: mock_uri.to_string(),
            content_api_url: mock_uri.to_string(),
            api_version: "2".to_string(),
            access_token: TEST_TOKEN.to_string(),
        },
        data: TestDataConfig {
            upload_source_path: format!("{}/upload/sample.txt", fixtures_dir()),
            ..TestDataConfig::default()
        },
        http: HttpConfig::default(),
        fixtures_dir: fixtures_dir(),
    }
}

/// Context wired to the mock server
pub fn mock_context(mock_uri: &str) -> HarnessContext {
    let config = mock_config(mock_uri);
    config.validate().expect("mock config must validate");
    HarnessContext::new(config).expect("context construction")
}
