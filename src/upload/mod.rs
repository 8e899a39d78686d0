//! Content upload helper
//!
//! Sends one file's bytes through the ESB proxy as an
//! `application/octet-stream` request body. Upload configuration (target
//! API, destination path, write mode, mute flag) travels as query parameters
//! on the proxy URL, which is how the connector's uploadFile action receives
//! it. No chunking, no resumable uploads, no concurrency.

use crate::config::{HarnessConfig, PropertyBag};
use crate::rest::{Method, RestClient, RestError, RestResponse};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to read upload source '{path}': {source}")]
    SourceError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Rest(#[from] RestError),
}

/// Uploads one local file through the proxy's uploadFile action.
#[derive(Debug, Clone)]
pub struct FileUploader {
    client: RestClient,
}

impl FileUploader {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    /// Build the proxy upload URL with percent-encoded query parameters.
    ///
    /// The destination path is `<folder_name_1>/<file_name>` from the bag,
    /// matching the folder the createFolder scenario provisions.
    pub fn build_url(
        config: &HarnessConfig,
        properties: &PropertyBag,
    ) -> Result<String, crate::config::MissingProperty> {
        let destination = format!(
            "{}/{}",
            properties.require("folder_name_1")?,
            properties.require("file_name")?
        );

        let params = [
            ("apiUrl", properties.require("content_api_url")?),
            ("accessToken", properties.require("access_token")?),
            ("apiVersion", properties.require("api_version")?),
            ("path", destination),
            ("mode", properties.require("write_mode")?),
            ("mute", properties.require("mute")?),
        ];

        let query = params
            .iter()
            .map(|(key, value)| {
                format!("{key}={}", utf8_percent_encode(value, NON_ALPHANUMERIC))
            })
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}?{}", config.proxy.url, query))
    }

    /// Read the file at `source` and send it to `url` with the given headers.
    pub async fn upload_file(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        source: &Path,
    ) -> Result<RestResponse, UploadError> {
        let content = std::fs::read(source).map_err(|source_err| UploadError::SourceError {
            path: source.display().to_string(),
            source: source_err,
        })?;

        tracing::debug!(bytes = content.len(), source = %source.display(), "uploading file");

        let response = self
            .client
            .send_bytes(url, Method::POST, headers, bytes::Bytes::from(content))
            .await?;

        Ok(response)
    }
}
