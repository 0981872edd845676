#[cfg(feature = "storage-gcs")]
use crate::GcsUploader;
#[cfg(feature = "storage-s3")]
use crate::S3Uploader;
use crate::{ArtifactoryUploader, FormUploader, Uploader};
use artifact_api_client::ApiClient;
use artifact_core::{AgentConfig, ArtifactError, ArtifactResult, BackendKind, Destination};
use std::sync::Arc;

/// Everything a backend may need at construction time.
#[derive(Clone, Copy)]
pub struct UploaderContext<'a> {
    pub config: &'a AgentConfig,
    pub api_client: &'a ApiClient,
    pub job_id: &'a str,
}

/// Create the uploader for a routed destination.
///
/// Fails with `UploaderConstruction` when the backend's settings are missing or
/// malformed; no uploader is returned half-configured.
pub fn create_uploader(
    destination: &Destination,
    ctx: UploaderContext<'_>,
) -> ArtifactResult<Arc<dyn Uploader>> {
    let uploader: Arc<dyn Uploader> = match destination.kind {
        BackendKind::Default => {
            if ctx.job_id.trim().is_empty() {
                return Err(ArtifactError::UploaderConstruction(
                    "job id is required for the default uploader".to_string(),
                ));
            }
            Arc::new(FormUploader::new(ctx.api_client.clone(), ctx.job_id))
        }

        #[cfg(feature = "storage-s3")]
        BackendKind::S3 => Arc::new(S3Uploader::new(destination, &ctx.config.s3)?),

        #[cfg(not(feature = "storage-s3"))]
        BackendKind::S3 => {
            return Err(ArtifactError::UploaderConstruction(
                "S3 uploads not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-gcs")]
        BackendKind::Gcs => Arc::new(GcsUploader::new(destination, &ctx.config.gcs)?),

        #[cfg(not(feature = "storage-gcs"))]
        BackendKind::Gcs => {
            return Err(ArtifactError::UploaderConstruction(
                "Google Cloud Storage uploads not available (storage-gcs feature not enabled)"
                    .to_string(),
            ))
        }

        BackendKind::Artifactory => Arc::new(ArtifactoryUploader::new(
            destination,
            &ctx.config.artifactory,
            ctx.config.http_timeout,
        )?),
    };

    tracing::debug!(
        backend = %uploader.kind(),
        key_prefix = %uploader.key_prefix(),
        "Uploader created"
    );

    Ok(uploader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn api_client() -> ApiClient {
        ApiClient::new(
            "http://localhost:3000".to_string(),
            "token".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn default_destination_selects_form_uploader() {
        let config = AgentConfig::default();
        let client = api_client();
        let ctx = UploaderContext {
            config: &config,
            api_client: &client,
            job_id: "job-1",
        };

        let uploader = create_uploader(&Destination::default_backend(), ctx).unwrap();
        assert_eq!(uploader.kind(), BackendKind::Default);
        assert_eq!(uploader.key_prefix(), "job-1");
    }

    #[test]
    fn default_uploader_needs_a_job() {
        let config = AgentConfig::default();
        let client = api_client();
        let ctx = UploaderContext {
            config: &config,
            api_client: &client,
            job_id: " ",
        };

        assert!(matches!(
            create_uploader(&Destination::default_backend(), ctx),
            Err(ArtifactError::UploaderConstruction(_))
        ));
    }

    #[cfg(feature = "storage-s3")]
    #[test]
    fn s3_destination_selects_s3_uploader() {
        let mut config = AgentConfig::default();
        config.s3.access_key_id = Some("AKIDEXAMPLE".to_string());
        config.s3.secret_access_key = Some("secret".to_string());
        let client = api_client();
        let ctx = UploaderContext {
            config: &config,
            api_client: &client,
            job_id: "job-1",
        };

        let destination = Destination::parse("s3://bucket/prefix").unwrap();
        let uploader = create_uploader(&destination, ctx).unwrap();
        assert_eq!(uploader.kind(), BackendKind::S3);
        assert_eq!(uploader.key_prefix(), "prefix");
    }

    #[test]
    fn unconfigured_artifactory_fails_construction() {
        let config = AgentConfig::default();
        let client = api_client();
        let ctx = UploaderContext {
            config: &config,
            api_client: &client,
            job_id: "job-1",
        };

        let destination = Destination::parse("rt://repo/job-1").unwrap();
        assert!(matches!(
            create_uploader(&destination, ctx),
            Err(ArtifactError::UploaderConstruction(_))
        ));
    }
}
