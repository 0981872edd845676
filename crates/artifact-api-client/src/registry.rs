//! Registration seam between the upload pipeline and the orchestration service.

use artifact_core::{
    Artifact, ArtifactError, ArtifactResult, ArtifactState, BatchRegistration, UploadResult,
};
use async_trait::async_trait;
use uuid::Uuid;

use crate::api::UpdateArtifactRequest;
use crate::{is_transient_error, ApiClient};

/// System of record for artifact batches.
///
/// Implementations must be safe to call from several upload workers at once.
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// Register every artifact of a batch before any upload starts.
    async fn create_artifact_batch(
        &self,
        job_id: &str,
        artifacts: &[Artifact],
    ) -> ArtifactResult<BatchRegistration>;

    /// Record the terminal state of one artifact.
    async fn update_artifact_status(
        &self,
        artifact_id: Uuid,
        state: ArtifactState,
        upload: Option<&UploadResult>,
    ) -> ArtifactResult<()>;
}

fn registration_error(err: anyhow::Error) -> ArtifactError {
    ArtifactError::registration(format!("{:#}", err), is_transient_error(&err))
}

#[async_trait]
impl ArtifactRegistry for ApiClient {
    async fn create_artifact_batch(
        &self,
        job_id: &str,
        artifacts: &[Artifact],
    ) -> ArtifactResult<BatchRegistration> {
        let response = self
            .create_artifacts(job_id, artifacts)
            .await
            .map_err(registration_error)?;

        if response.artifact_ids.len() != artifacts.len() {
            return Err(ArtifactError::registration(
                format!(
                    "service returned {} artifact ids for {} artifacts",
                    response.artifact_ids.len(),
                    artifacts.len()
                ),
                false,
            ));
        }

        tracing::debug!(
            batch_id = %response.id,
            artifact_count = artifacts.len(),
            "Artifact batch registered"
        );

        Ok(BatchRegistration {
            batch_id: response.id,
            artifact_ids: response.artifact_ids,
        })
    }

    async fn update_artifact_status(
        &self,
        artifact_id: Uuid,
        state: ArtifactState,
        upload: Option<&UploadResult>,
    ) -> ArtifactResult<()> {
        let request = UpdateArtifactRequest::new(state, upload);
        self.update_artifact(artifact_id, &request)
            .await
            .map_err(registration_error)
    }
}
