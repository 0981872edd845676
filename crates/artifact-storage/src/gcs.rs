use crate::object::{client_options_with_header, put_artifact};
use crate::traits::{read_content, ArtifactContent, Uploader};
use artifact_core::{
    Artifact, ArtifactError, ArtifactResult, BackendKind, Destination, GcsSettings, UploadError,
    UploadResult,
};
use async_trait::async_trait;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};

const PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// Google Cloud Storage uploader
#[derive(Clone)]
pub struct GcsUploader {
    store: GoogleCloudStorage,
    bucket: String,
    prefix: String,
}

impl GcsUploader {
    /// Create a new GcsUploader for a `gs://bucket/prefix` destination.
    ///
    /// Without an explicit credentials file the standard application-default lookup
    /// applies. A configured ACL is sent as `x-goog-acl` on every write.
    pub fn new(destination: &Destination, settings: &GcsSettings) -> ArtifactResult<Self> {
        let construction = |e: String| ArtifactError::UploaderConstruction(format!("GCS: {}", e));

        let client_options =
            client_options_with_header("x-goog-acl", settings.acl.as_deref()).map_err(construction)?;

        let mut builder = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(destination.container.clone())
            .with_client_options(client_options);

        if let Some(ref credentials) = settings.application_credentials {
            builder = builder.with_application_credentials(credentials.clone());
        }

        let store = builder.build().map_err(|e| construction(e.to_string()))?;

        Ok(GcsUploader {
            store,
            bucket: destination.container.clone(),
            prefix: destination.prefix.clone(),
        })
    }

    fn generate_url(bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", PUBLIC_BASE_URL, bucket, key)
    }
}

#[async_trait]
impl Uploader for GcsUploader {
    async fn upload(
        &self,
        artifact: &Artifact,
        content: ArtifactContent,
    ) -> Result<UploadResult, UploadError> {
        let key = self.object_key(artifact);
        let data = read_content(artifact, content).await?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        put_artifact(&self.store, &key, artifact, data)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    "GCS upload failed"
                );
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        let url = Self::generate_url(&self.bucket, &key);
        Ok(UploadResult::new(key, Some(url)))
    }

    fn key_prefix(&self) -> String {
        self.prefix.clone()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gcs
    }
}
