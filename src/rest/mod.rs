//! REST request helper
//!
//! Builds one JSON HTTP request, sends it, and wraps the response for
//! field-level comparison. One round trip per call: no retries, no
//! redirect following, no backpressure. The harness asserts on whatever the
//! endpoint returned, including error statuses, so non-2xx responses are not
//! errors here.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub use reqwest::Method;

/// REST helper errors
#[derive(Error, Debug)]
pub enum RestError {
    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Response from {url} is not valid JSON: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable wrapper of one HTTP exchange.
///
/// Created per call, discarded after assertions. Header names are
/// lower-cased so comparisons are case-insensitive.
#[derive(Debug, Clone)]
pub struct RestResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Value,
}

impl RestResponse {
    pub(crate) fn new(status: u16, headers: HashMap<String, String>, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response header, by lower-cased name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    /// All response headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Parsed JSON body; `Value::Null` when the endpoint returned no content
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Whether the body carries the named top-level field
    pub fn has(&self, field: &str) -> bool {
        self.body.get(field).is_some()
    }
}

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
}

impl RestClient {
    /// Create a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, RestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::ClientError(e.to_string()))?;
        Ok(Self { client })
    }

    /// Send one JSON request and wrap the response.
    ///
    /// `body` of `None` sends no payload. A non-2xx status is returned in
    /// the wrapper, not surfaced as an error; only transport failures and
    /// unparseable bodies fail the call.
    pub async fn send_json(
        &self,
        url: &str,
        method: Method,
        headers: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Result<RestResponse, RestError> {
        let mut request = self.client.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        self.dispatch(url, &method, request).await
    }

    /// Send one request with a raw byte payload (content uploads).
    pub async fn send_bytes(
        &self,
        url: &str,
        method: Method,
        headers: &HashMap<String, String>,
        body: bytes::Bytes,
    ) -> Result<RestResponse, RestError> {
        let mut request = self.client.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.body(body);

        self.dispatch(url, &method, request).await
    }

    async fn dispatch(
        &self,
        url: &str,
        method: &Method,
        request: reqwest::RequestBuilder,
    ) -> Result<RestResponse, RestError> {
        tracing::debug!(%method, url, "sending request");

        let response = request.send().await.map_err(|source| RestError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                response_headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        let raw = response.text().await.map_err(|source| RestError::Transport {
            url: url.to_string(),
            source,
        })?;

        let body = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).map_err(|source| RestError::InvalidJson {
                url: url.to_string(),
                source,
            })?
        };

        tracing::debug!(status, url, "received response");

        Ok(RestResponse::new(status, response_headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_field_access() {
        let response = RestResponse::new(
            200,
            HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            json!({"id": "id:abc", ".tag": "folder"}),
        );
        assert_eq!(response.status(), 200);
        assert!(response.has("id"));
        assert!(!response.has("error"));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body()["id"], "id:abc");
    }

    #[test]
    fn test_null_body_has_no_fields() {
        let response = RestResponse::new(204, HashMap::new(), Value::Null);
        assert!(!response.has("error"));
    }
}
