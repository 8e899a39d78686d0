//! Connector parity scenarios
//!
//! Each scenario issues a request through the ESB proxy and an equivalent
//! direct call to the Dropbox API, then asserts that the two responses
//! (status code, body fields, error tags) agree. The shared
//! [`HarnessContext`] carries the configuration, the property bag scenario
//! steps stash state in, and the HTTP helpers.

use crate::config::{HarnessConfig, PropertyBag};
use crate::fixture::FixtureStore;
use crate::rest::{Method, RestClient, RestError, RestResponse};
use crate::sequence::StepError;
use crate::upload::FileUploader;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub mod dropbox;

pub use dropbox::parity_plan;

/// Connector actions, selected through the proxy's `Action` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateFolder,
    UploadFile,
    GetTemporaryLink,
    Copy,
    GetMetadata,
    CreateSharedLinkWithSettings,
    ListRevisions,
    Search,
    Move,
    Delete,
    RestoreFile,
}

impl Action {
    /// Header value the proxy dispatches on
    pub fn urn(&self) -> &'static str {
        match self {
            Action::CreateFolder => "urn:createFolder",
            Action::UploadFile => "urn:uploadFile",
            Action::GetTemporaryLink => "urn:getTemporaryLink",
            Action::Copy => "urn:copy",
            Action::GetMetadata => "urn:getMetadata",
            Action::CreateSharedLinkWithSettings => "urn:createSharedLinkWithSettings",
            Action::ListRevisions => "urn:listRevisions",
            Action::Search => "urn:search",
            Action::Move => "urn:move",
            Action::Delete => "urn:delete",
            Action::RestoreFile => "urn:restoreFile",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.urn())
    }
}

/// Shared state for one suite run.
pub struct HarnessContext {
    pub config: HarnessConfig,
    pub properties: PropertyBag,
    pub client: RestClient,
    pub fixtures: FixtureStore,
    pub uploader: FileUploader,
}

impl HarnessContext {
    /// Build a context from validated configuration.
    pub fn new(config: HarnessConfig) -> Result<Self, RestError> {
        let client = RestClient::new(Duration::from_secs(config.http.timeout_seconds))?;
        let properties = config.seed_properties();
        let fixtures = FixtureStore::new(&config.fixtures_dir);
        let uploader = FileUploader::new(client.clone());
        Ok(Self {
            config,
            properties,
            client,
            fixtures,
            uploader,
        })
    }

    /// Headers for a JSON request through the ESB proxy
    pub fn esb_headers(&self, action: Action) -> HashMap<String, String> {
        HashMap::from([
            ("Accept-Charset".to_string(), "UTF-8".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Action".to_string(), action.urn().to_string()),
        ])
    }

    /// Headers for a direct Dropbox API call
    pub fn api_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("Accept-Charset".to_string(), "UTF-8".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.dropbox.access_token),
            ),
        ])
    }

    /// Render a fixture and POST it to the ESB proxy under the given action.
    pub async fn send_esb(
        &self,
        action: Action,
        fixture: &str,
    ) -> Result<RestResponse, StepError> {
        let body = self.fixtures.render(fixture, &self.properties)?;
        let response = self
            .client
            .send_json(
                &self.config.proxy.url,
                Method::POST,
                &self.esb_headers(action),
                Some(&body),
            )
            .await?;
        Ok(response)
    }

    /// Render a fixture and POST it directly to a Dropbox API endpoint
    /// (path like `/2/files/get_metadata`).
    pub async fn send_api(
        &self,
        endpoint: &str,
        fixture: &str,
    ) -> Result<RestResponse, StepError> {
        let url = format!("{}{}", self.config.dropbox.api_url, endpoint);
        let body = self.fixtures.render(fixture, &self.properties)?;
        let response = self
            .client
            .send_json(&url, Method::POST, &self.api_headers(), Some(&body))
            .await?;
        Ok(response)
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Top-level body field, failing with the response's origin in the message.
pub(crate) fn field<'a>(
    response: &'a RestResponse,
    origin: &str,
    name: &str,
) -> Result<&'a Value, StepError> {
    response.body().get(name).ok_or_else(|| StepError::MissingField {
        context: origin.to_string(),
        field: name.to_string(),
    })
}

/// Body field coerced to its string content
pub(crate) fn string_field(
    response: &RestResponse,
    origin: &str,
    name: &str,
) -> Result<String, StepError> {
    let value = field(response, origin, name)?;
    Ok(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Equality assertion with a labelled message
pub(crate) fn ensure_eq<T: PartialEq + fmt::Debug>(
    what: &str,
    left: T,
    right: T,
) -> Result<(), StepError> {
    if left == right {
        Ok(())
    } else {
        Err(StepError::Check(format!(
            "{what} mismatch: {left:?} != {right:?}"
        )))
    }
}

/// Status-code assertion
pub(crate) fn ensure_status(response: &RestResponse, expected: u16) -> Result<(), StepError> {
    ensure_eq("status code", response.status(), expected)
}

/// `.tag` of the body's `error` object (Dropbox conflict taxonomy)
pub(crate) fn error_tag(response: &RestResponse, origin: &str) -> Result<String, StepError> {
    let error = field(response, origin, "error")?;
    let tag = error.get(".tag").ok_or_else(|| StepError::MissingField {
        context: origin.to_string(),
        field: "error..tag".to_string(),
    })?;
    Ok(match tag {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> RestResponse {
        RestResponse::new(409, HashMap::new(), body)
    }

    #[test]
    fn test_action_urns() {
        assert_eq!(Action::CreateFolder.urn(), "urn:createFolder");
        assert_eq!(Action::RestoreFile.to_string(), "urn:restoreFile");
    }

    #[test]
    fn test_field_missing_reports_origin() {
        let r = response(json!({}));
        let err = field(&r, "proxy", "id").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected field 'id' missing from proxy response body"
        );
    }

    #[test]
    fn test_string_field_coerces_non_strings() {
        let r = response(json!({"id": "id:abc", "size": 42}));
        assert_eq!(string_field(&r, "proxy", "id").unwrap(), "id:abc");
        assert_eq!(string_field(&r, "proxy", "size").unwrap(), "42");
    }

    #[test]
    fn test_error_tag_extraction() {
        let r = response(json!({
            "error_summary": "path/conflict/folder/..",
            "error": {".tag": "path", "path": {".tag": "conflict"}}
        }));
        assert_eq!(error_tag(&r, "proxy").unwrap(), "path");
    }

    #[test]
    fn test_ensure_eq_mismatch_message() {
        let err = ensure_eq("entry id", "a", "b").unwrap_err();
        assert!(err.to_string().contains("entry id mismatch"));
    }
}
