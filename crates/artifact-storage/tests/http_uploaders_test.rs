use std::time::Duration;

use artifact_api_client::ApiClient;
use artifact_core::{Artifact, ArtifactorySettings, Destination, UploadError};
use artifact_storage::{ArtifactContent, ArtifactoryUploader, FormUploader, Uploader};
use mockito::Matcher;
use uuid::Uuid;

const BODY: &[u8] = b"build log line\n";

fn content() -> ArtifactContent {
    Box::pin(std::io::Cursor::new(BODY))
}

fn registered_artifact() -> Artifact {
    let mut artifact = Artifact::new(
        "/work/log/build.log",
        "log/build.log",
        BODY.len() as u64,
        "0f1e2d",
        "text/plain",
    );
    artifact.id = Some(Uuid::new_v4());
    artifact
}

fn api_client(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(server.url(), "agent-token".to_string(), Duration::from_secs(5)).unwrap()
}

fn artifactory(server: &mockito::ServerGuard) -> ArtifactoryUploader {
    let destination = Destination::parse("rt://builds/job-7").unwrap();
    let settings = ArtifactorySettings {
        url: Some(format!("{}/artifactory", server.url())),
        user: Some("carol".to_string()),
        password: Some("secret".to_string()),
    };
    ArtifactoryUploader::new(&destination, &settings, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn form_upload_posts_multipart_to_the_service() {
    let mut server = mockito::Server::new_async().await;
    let artifact = registered_artifact();
    let artifact_id = artifact.id.unwrap();

    let mock = server
        .mock(
            "POST",
            format!("/v3/jobs/job-7/artifacts/{}/upload", artifact_id).as_str(),
        )
        .match_header("authorization", "Bearer agent-token")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data".to_string()),
        )
        .match_body(Matcher::Regex("build log line".to_string()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"key":"job-7/log/build.log","url":"https://files.example.com/job-7/log/build.log"}"#)
        .create_async()
        .await;

    let uploader = FormUploader::new(api_client(&server), "job-7");
    let result = uploader.upload(&artifact, content()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(result.key, "job-7/log/build.log");
    assert_eq!(
        result.url.as_deref(),
        Some("https://files.example.com/job-7/log/build.log")
    );
}

#[tokio::test]
async fn form_upload_server_error_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", Matcher::Regex(r"^/v3/jobs/job-7/artifacts/.+/upload$".to_string()))
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let uploader = FormUploader::new(api_client(&server), "job-7");
    let err = uploader
        .upload(&registered_artifact(), content())
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn form_upload_requires_registration() {
    let server = mockito::Server::new_async().await;
    let mut artifact = registered_artifact();
    artifact.id = None;

    let uploader = FormUploader::new(api_client(&server), "job-7");
    let err = uploader.upload(&artifact, content()).await.unwrap_err();

    assert!(matches!(err, UploadError::Permanent(_)));
}

#[tokio::test]
async fn artifactory_put_sends_checksum_and_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/artifactory/builds/job-7/log/build.log")
        .match_header("x-checksum-sha256", "0f1e2d")
        .match_header("content-type", "text/plain")
        .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
        .match_body(Matcher::Exact("build log line\n".to_string()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"downloadUri":"https://rt.example.com/artifactory/builds/job-7/log/build.log"}"#)
        .create_async()
        .await;

    let result = artifactory(&server)
        .upload(&registered_artifact(), content())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.key, "job-7/log/build.log");
    assert_eq!(
        result.url.as_deref(),
        Some("https://rt.example.com/artifactory/builds/job-7/log/build.log")
    );
}

#[tokio::test]
async fn artifactory_forbidden_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PUT", "/artifactory/builds/job-7/log/build.log")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let err = artifactory(&server)
        .upload(&registered_artifact(), content())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Permanent(_)));
}
