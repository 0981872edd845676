use crate::object::{client_options_with_header, put_artifact};
use crate::traits::{read_content, ArtifactContent, Uploader};
use artifact_core::{
    Artifact, ArtifactError, ArtifactResult, BackendKind, Destination, S3Settings, UploadError,
    UploadResult,
};
use async_trait::async_trait;
use object_store::aws::{AmazonS3, AmazonS3Builder};

/// S3 uploader
#[derive(Clone)]
pub struct S3Uploader {
    store: AmazonS3,
    bucket: String,
    prefix: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Uploader {
    /// Create a new S3Uploader for an `s3://bucket/prefix` destination.
    ///
    /// Explicit credentials from `settings` take precedence over the usual AWS
    /// environment and instance-profile lookup. Every object is written with the
    /// configured canned ACL.
    pub fn new(destination: &Destination, settings: &S3Settings) -> ArtifactResult<Self> {
        let construction = |e: String| ArtifactError::UploaderConstruction(format!("S3: {}", e));

        let client_options =
            client_options_with_header("x-amz-acl", Some(settings.acl.as_str())).map_err(construction)?;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(destination.container.clone())
            .with_client_options(client_options);

        if let Some(ref key_id) = settings.access_key_id {
            builder = builder.with_access_key_id(key_id.clone());
        }
        if let Some(ref secret) = settings.secret_access_key {
            builder = builder.with_secret_access_key(secret.clone());
        }
        if let Some(ref token) = settings.session_token {
            builder = builder.with_token(token.clone());
        }
        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder.build().map_err(|e| construction(e.to_string()))?;

        Ok(S3Uploader {
            store,
            bucket: destination.container.clone(),
            prefix: destination.prefix.clone(),
            region: settings.region.clone(),
            endpoint_url: settings.endpoint.clone(),
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        match self.endpoint_url {
            Some(ref endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[async_trait]
impl Uploader for S3Uploader {
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
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        let url = self.generate_url(&key);
        Ok(UploadResult::new(key, Some(url)))
    }

    fn key_prefix(&self) -> String {
        self.prefix.clone()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }
}
