//! Artifact endpoints of the orchestration service.

use anyhow::{Context, Result};
use artifact_core::{Artifact, ArtifactState, UploadResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiClient, API_PREFIX};

/// One artifact as submitted for registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactPayload {
    pub path: String,
    pub absolute_path: String,
    pub file_size: u64,
    pub content_type: String,
    pub sha256sum: String,
}

impl From<&Artifact> for ArtifactPayload {
    fn from(artifact: &Artifact) -> Self {
        Self {
            path: artifact.path.clone(),
            absolute_path: artifact.absolute_path.to_string_lossy().into_owned(),
            file_size: artifact.file_size,
            content_type: artifact.content_type.clone(),
            sha256sum: artifact.sha256sum.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateArtifactsRequest {
    pub artifacts: Vec<ArtifactPayload>,
}

/// Batch registration response. `artifact_ids` follows the request order.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateArtifactsResponse {
    pub id: Uuid,
    pub artifact_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateArtifactRequest {
    pub state: ArtifactState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl UpdateArtifactRequest {
    pub fn new(state: ArtifactState, upload: Option<&UploadResult>) -> Self {
        Self {
            state,
            key: upload.map(|u| u.key.clone()),
            url: upload.and_then(|u| u.url.clone()),
            uploaded_at: upload.map(|u| u.uploaded_at),
        }
    }
}

/// Response to a form upload handled by the service itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormUploadResponse {
    pub key: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ApiClient {
    /// Register a batch of artifacts for a job.
    pub async fn create_artifacts(
        &self,
        job_id: &str,
        artifacts: &[Artifact],
    ) -> Result<CreateArtifactsResponse> {
        let body = CreateArtifactsRequest {
            artifacts: artifacts.iter().map(ArtifactPayload::from).collect(),
        };

        self.post_json(&format!("{}/jobs/{}/artifacts", API_PREFIX, urlencoding::encode(job_id)), &body)
            .await
            .with_context(|| format!("Failed to register {} artifacts", artifacts.len()))
    }

    /// Report the terminal state of one artifact.
    pub async fn update_artifact(&self, artifact_id: Uuid, request: &UpdateArtifactRequest) -> Result<()> {
        self.put_json(&format!("{}/artifacts/{}", API_PREFIX, artifact_id), request)
            .await
            .with_context(|| format!("Failed to update artifact {}", artifact_id))
    }

    /// Upload an artifact's bytes to the service as a multipart form.
    pub async fn upload_artifact_form(
        &self,
        job_id: &str,
        artifact_id: Uuid,
        form: reqwest::multipart::Form,
    ) -> Result<FormUploadResponse> {
        self.post_multipart(
            &format!(
                "{}/jobs/{}/artifacts/{}/upload",
                API_PREFIX,
                urlencoding::encode(job_id),
                artifact_id
            ),
            form,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_copies_artifact_fields() {
        let artifact = Artifact::new("/work/log/a.log", "log/a.log", 42, "abc123", "text/plain");
        let payload = ArtifactPayload::from(&artifact);
        assert_eq!(payload.path, "log/a.log");
        assert_eq!(payload.absolute_path, "/work/log/a.log");
        assert_eq!(payload.file_size, 42);
        assert_eq!(payload.sha256sum, "abc123");
    }

    #[test]
    fn failed_update_omits_upload_metadata() {
        let request = UpdateArtifactRequest::new(ArtifactState::Failed, None);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "state": "failed" }));
    }

    #[test]
    fn uploaded_update_carries_key_and_url() {
        let upload = UploadResult::new("prefix/a.log", Some("https://x/prefix/a.log".to_string()));
        let request = UpdateArtifactRequest::new(ArtifactState::Uploaded, Some(&upload));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["state"], "uploaded");
        assert_eq!(json["key"], "prefix/a.log");
        assert_eq!(json["url"], "https://x/prefix/a.log");
        assert!(json.get("uploaded_at").is_some());
    }
}
