use artifact_core::{
    Artifact, ArtifactError, ArtifactResult, ArtifactorySettings, BackendKind, Destination,
    UploadError, UploadResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::traits::{read_content, ArtifactContent, Uploader};

/// Subset of Artifactory's deploy response we care about.
#[derive(Debug, Deserialize)]
struct DeployResponse {
    #[serde(rename = "downloadUri")]
    download_uri: Option<String>,
}

/// Artifactory uploader
///
/// Deploys each artifact with an HTTP PUT to `{url}/{repository}/{key}` using basic
/// auth, sending the SHA-256 so Artifactory can verify the content.
#[derive(Clone)]
pub struct ArtifactoryUploader {
    client: Client,
    base_url: String,
    repository: String,
    prefix: String,
    user: String,
    password: String,
}

impl ArtifactoryUploader {
    pub fn new(
        destination: &Destination,
        settings: &ArtifactorySettings,
        timeout: Duration,
    ) -> ArtifactResult<Self> {
        let require = |value: &Option<String>, name: &str| {
            value.clone().ok_or_else(|| {
                ArtifactError::UploaderConstruction(format!(
                    "Artifactory: {} not configured",
                    name
                ))
            })
        };

        let base_url = require(&settings.url, "ARTIFACT_AGENT_ARTIFACTORY_URL")?;
        let user = require(&settings.user, "ARTIFACT_AGENT_ARTIFACTORY_USER")?;
        let password = require(&settings.password, "ARTIFACT_AGENT_ARTIFACTORY_PASSWORD")?;

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            ArtifactError::UploaderConstruction(format!("Artifactory: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: destination.container.clone(),
            prefix: destination.prefix.clone(),
            user,
            password,
        })
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.repository, key)
    }
}

fn classify_request_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        UploadError::Transient(err.to_string())
    } else {
        UploadError::Permanent(err.to_string())
    }
}

#[async_trait]
impl Uploader for ArtifactoryUploader {
    async fn upload(
        &self,
        artifact: &Artifact,
        content: ArtifactContent,
    ) -> Result<UploadResult, UploadError> {
        let key = self.object_key(artifact);
        let url = self.generate_url(&key);
        let data = read_content(artifact, content).await?;
        let size = data.len();
        let start = std::time::Instant::now();

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.user, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, artifact.content_type.as_str())
            .header("X-Checksum-Sha256", artifact.sha256sum.as_str())
            .body(data)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                repository = %self.repository,
                key = %key,
                "Artifactory upload rejected"
            );
            return Err(UploadError::from_status(status.as_u16(), body));
        }

        // Older Artifactory versions answer with an empty body.
        let download_uri = response
            .json::<DeployResponse>()
            .await
            .ok()
            .and_then(|r| r.download_uri);

        tracing::info!(
            repository = %self.repository,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifactory upload successful"
        );

        Ok(UploadResult::new(key, Some(download_uri.unwrap_or(url))))
    }

    fn key_prefix(&self) -> String {
        self.prefix.clone()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Artifactory
    }
}
