//! Content upload helper integration tests

mod common;

use common::{mock_config, mock_context};
use dropbox_connector_harness::scenarios::Action;
use dropbox_connector_harness::upload::{FileUploader, UploadError};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_upload_sends_file_bytes_with_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::PROXY_PATH))
        .and(header("Action", "urn:uploadFile"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(query_param("accessToken", common::TEST_TOKEN))
        .and(query_param(
            "path",
            "/ConnectorFolderOne/connectorUpload.txt",
        ))
        .and(query_param("mode", "add"))
        .and(query_param("mute", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "id:upload1",
            "name": "connectorUpload.txt",
            "rev": "0123456789abcdef01234"
        })))
        .mount(&server)
        .await;

    let ctx = mock_context(&server.uri());
    let url = FileUploader::build_url(&ctx.config, &ctx.properties).unwrap();
    let mut headers = ctx.esb_headers(Action::UploadFile);
    headers.insert(
        "Content-Type".to_string(),
        "application/octet-stream".to_string(),
    );

    let source = ctx.properties.require("upload_source_path").unwrap();
    let response = ctx
        .uploader
        .upload_file(&url, &headers, Path::new(&source))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.has("id"));

    // The body on the wire is exactly the file's bytes
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let expected = std::fs::read(&source).unwrap();
    assert_eq!(received[0].body, expected);
}

#[tokio::test]
async fn test_upload_missing_source_fails_before_any_request() {
    let server = MockServer::start().await;
    let ctx = mock_context(&server.uri());
    let url = FileUploader::build_url(&ctx.config, &ctx.properties).unwrap();

    let result = ctx
        .uploader
        .upload_file(
            &url,
            &ctx.esb_headers(Action::UploadFile),
            Path::new("no/such/file.txt"),
        )
        .await;

    assert!(matches!(result, Err(UploadError::SourceError { .. })));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_build_url_targets_configured_proxy() {
    let server = MockServer::start().await;
    let config = mock_config(&server.uri());
    let properties = config.seed_properties();

    let url = FileUploader::build_url(&config, &properties).unwrap();
    assert!(url.starts_with(&format!("{}{}?", server.uri(), common::PROXY_PATH)));
    assert!(url.contains("apiVersion=2"));
}
