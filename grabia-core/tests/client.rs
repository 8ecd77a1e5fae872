use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use grabia_core::{ArchiveClient, ArchiveError, USER_AGENT};

#[tokio::test]
async fn get_metadata_sends_client_tag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/item1"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "name": "a.txt", "size": "10", "format": "Text" },
                { "name": "item1_meta.xml", "size": 5 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri()).unwrap();
    let metadata = client.get_metadata("item1").await.unwrap();

    assert_eq!(metadata.files.len(), 2);
    assert_eq!(metadata.files[0].name, "a.txt");
    assert_eq!(metadata.files[0].size, 10);
    assert_eq!(metadata.files[1].size, 5);
}

#[tokio::test]
async fn get_metadata_unknown_item_is_empty_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/nothing-here"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri()).unwrap();
    let metadata = client.get_metadata("nothing-here").await.unwrap();

    assert!(metadata.files.is_empty());
}

#[tokio::test]
async fn get_metadata_surfaces_api_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/private"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri()).unwrap();
    let err = client.get_metadata("private").await.unwrap_err();

    match err {
        ArchiveError::Api { status, body } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body, "forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn get_metadata_malformed_body_is_request_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metadata/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri()).unwrap();
    let err = client.get_metadata("broken").await.unwrap_err();

    assert!(err.is_transport());
    assert!(err.status().is_none());
}
