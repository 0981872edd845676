use std::time::Duration;

use artifact_api_client::{ApiClient, ArtifactRegistry};
use artifact_core::{Artifact, ArtifactError, ArtifactState, UploadResult};
use mockito::Matcher;
use uuid::Uuid;

fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(server.url(), "agent-token".to_string(), Duration::from_secs(5)).unwrap()
}

fn sample_artifacts() -> Vec<Artifact> {
    vec![
        Artifact::new("/work/log/a.log", "log/a.log", 3, "aaa", "text/plain"),
        Artifact::new("/work/log/b.log", "log/b.log", 5, "bbb", "text/plain"),
    ]
}

#[tokio::test]
async fn create_batch_returns_index_aligned_ids() {
    let mut server = mockito::Server::new_async().await;
    let batch_id = Uuid::new_v4();
    let ids = [Uuid::new_v4(), Uuid::new_v4()];

    let mock = server
        .mock("POST", "/v3/jobs/job-1/artifacts")
        .match_header("authorization", "Bearer agent-token")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "artifacts": [
                { "path": "log/a.log", "sha256sum": "aaa", "file_size": 3 },
                { "path": "log/b.log", "sha256sum": "bbb", "file_size": 5 }
            ]
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({ "id": batch_id, "artifact_ids": ids }).to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let registration = client
        .create_artifact_batch("job-1", &sample_artifacts())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(registration.batch_id, batch_id);
    assert_eq!(registration.artifact_ids, ids.to_vec());
}

#[tokio::test]
async fn create_batch_rejects_mismatched_id_count() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/jobs/job-1/artifacts")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({ "id": Uuid::new_v4(), "artifact_ids": [Uuid::new_v4()] })
                .to_string(),
        )
        .create_async()
        .await;

    let err = client_for(&server)
        .create_artifact_batch("job-1", &sample_artifacts())
        .await
        .unwrap_err();

    assert!(matches!(err, ArtifactError::Registration { transient: false, .. }));
}

#[tokio::test]
async fn server_errors_are_transient_registration_failures() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/jobs/job-1/artifacts")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let err = client_for(&server)
        .create_artifact_batch("job-1", &sample_artifacts())
        .await
        .unwrap_err();

    match err {
        ArtifactError::Registration { message, transient } => {
            assert!(transient);
            assert!(message.contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("PUT", Matcher::Regex(r"^/v3/artifacts/.+$".to_string()))
        .with_status(401)
        .with_body("bad token")
        .create_async()
        .await;

    let err = client_for(&server)
        .update_artifact_status(Uuid::new_v4(), ArtifactState::Failed, None)
        .await
        .unwrap_err();

    assert!(!err.is_transient());
}

#[tokio::test]
async fn update_status_sends_upload_metadata() {
    let mut server = mockito::Server::new_async().await;
    let artifact_id = Uuid::new_v4();

    let mock = server
        .mock("PUT", format!("/v3/artifacts/{}", artifact_id).as_str())
        .match_body(Matcher::PartialJson(serde_json::json!({
            "state": "uploaded",
            "key": "job-1/log/a.log"
        })))
        .with_status(200)
        .create_async()
        .await;

    let upload = UploadResult::new("job-1/log/a.log", None);
    client_for(&server)
        .update_artifact_status(artifact_id, ArtifactState::Uploaded, Some(&upload))
        .await
        .unwrap();

    mock.assert_async().await;
}
