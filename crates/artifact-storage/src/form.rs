use artifact_api_client::{ApiClient, ApiStatusError};
use artifact_core::{Artifact, BackendKind, UploadError, UploadResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::traits::{read_content, ArtifactContent, Uploader};

/// Default uploader: sends each artifact to the orchestration service as a
/// multipart form. Needs no bucket credentials.
#[derive(Clone)]
pub struct FormUploader {
    client: ApiClient,
    job_id: String,
}

impl FormUploader {
    pub fn new(client: ApiClient, job_id: impl Into<String>) -> Self {
        Self {
            client,
            job_id: job_id.into(),
        }
    }

    fn build_form(artifact: &Artifact, data: Vec<u8>) -> Result<Form, UploadError> {
        let file_name = artifact
            .path
            .rsplit('/')
            .next()
            .unwrap_or(artifact.path.as_str())
            .to_string();

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(&artifact.content_type)
            .map_err(|e| {
                UploadError::Permanent(format!(
                    "invalid content type '{}': {}",
                    artifact.content_type, e
                ))
            })?;

        Ok(Form::new()
            .text("path", artifact.path.clone())
            .text("sha256sum", artifact.sha256sum.clone())
            .text("content_type", artifact.content_type.clone())
            .part("file", part))
    }
}

/// Turn an API client error into an upload error, keeping its retry classification.
fn classify(err: anyhow::Error) -> UploadError {
    if let Some(status) = err.downcast_ref::<ApiStatusError>() {
        return UploadError::from_status(status.status, &status.body);
    }
    if artifact_api_client::is_transient_error(&err) {
        UploadError::Transient(format!("{:#}", err))
    } else {
        UploadError::Permanent(format!("{:#}", err))
    }
}

#[async_trait]
impl Uploader for FormUploader {
    async fn upload(
        &self,
        artifact: &Artifact,
        content: ArtifactContent,
    ) -> Result<UploadResult, UploadError> {
        let artifact_id = artifact.id.ok_or_else(|| {
            UploadError::Permanent(format!("{} has not been registered", artifact.path))
        })?;

        let data = read_content(artifact, content).await?;
        let size = data.len();
        let form = Self::build_form(artifact, data)?;
        let start = std::time::Instant::now();

        let response = self
            .client
            .upload_artifact_form(&self.job_id, artifact_id, form)
            .await
            .map_err(classify)?;

        tracing::info!(
            artifact_id = %artifact_id,
            key = %response.key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Form upload successful"
        );

        Ok(UploadResult::new(response.key, response.url))
    }

    fn key_prefix(&self) -> String {
        self.job_id.clone()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Default
    }
}
