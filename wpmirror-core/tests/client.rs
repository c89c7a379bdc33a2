use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wpmirror_core::{CpanelClient, CpanelError, CpanelOptions, ErrorClass};

fn client_for(server: &MockServer) -> CpanelClient {
    CpanelClient::with_base_url(
        &server.uri(),
        "wpuser",
        "SECRETTOKEN",
        &CpanelOptions::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn list_files_sends_cpanel_auth_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/Fileman/list_files"))
        .and(header("authorization", "cpanel wpuser:SECRETTOKEN"))
        .and(query_param("dir", "/public_html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "errors": null,
            "data": [
                { "file": "wp-config.php", "type": "file", "size": 2912 },
                { "file": "wp-content", "type": "dir" }
            ]
        })))
        .mount(&server)
        .await;

    let rows = client_for(&server).list_files("/public_html").await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["file"], "wp-config.php");
    assert_eq!(rows[1]["type"], "dir");
}

#[tokio::test]
async fn list_files_falls_back_to_api2_on_uapi_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/Fileman/list_files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 0,
            "errors": ["Unknown function list_files"],
            "data": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/Fileman/list_files"))
        .and(query_param("dir", "/public_html"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cpanelresult": {
                "data": [ { "file": "index.php", "type": "file" } ]
            }
        })))
        .mount(&server)
        .await;

    let rows = client_for(&server).list_files("/public_html").await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["file"], "index.php");
}

#[tokio::test]
async fn list_files_surfaces_uapi_error_when_fallback_also_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/Fileman/list_files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": ["Access denied to /root"],
            "data": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2/Fileman/list_files"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_files("/root").await.unwrap_err();

    match err {
        CpanelError::Rejected(message) => assert!(message.contains("Access denied")),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn list_files_tolerates_missing_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/Fileman/list_files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 1,
            "errors": null
        })))
        .mount(&server)
        .await;

    let rows = client_for(&server).list_files("/empty").await.unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn unauthorized_listing_classifies_as_auth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Access denied"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_files("/").await.unwrap_err();

    assert_eq!(err.classification(), ErrorClass::Auth);
}

#[tokio::test]
async fn unreachable_host_classifies_as_connection() {
    // Reserved TEST-NET-1 address; nothing listens there.
    let client = CpanelClient::with_base_url(
        "http://192.0.2.1:1",
        "wpuser",
        "SECRETTOKEN",
        &CpanelOptions {
            timeout: std::time::Duration::from_millis(200),
            accept_invalid_certs: false,
        },
    )
    .unwrap();

    let err = client.list_files("/").await.unwrap_err();

    assert_eq!(err.classification(), ErrorClass::Connection);
}

#[tokio::test]
async fn download_streams_body_to_target_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/FileManager/download_file"))
        .and(query_param("file", "/public_html/wp-config.php"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<?php // config".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("wp-config.php");
    client_for(&server)
        .download_to_path("/public_html/wp-config.php", &target)
        .await
        .unwrap();

    let written = std::fs::read(&target).unwrap();
    assert_eq!(written, b"<?php // config");
}

#[tokio::test]
async fn download_failure_reports_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/execute/FileManager/download_file"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such file"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing.php");
    let err = client_for(&server)
        .download_to_path("/public_html/missing.php", &target)
        .await
        .unwrap_err();

    match err {
        CpanelError::Api { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "no such file");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(!target.exists());
}
