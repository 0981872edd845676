//! Uploader abstraction trait
//!
//! This module defines the Uploader trait that all storage backends must implement.

use artifact_core::{Artifact, BackendKind, UploadError, UploadResult};
use async_trait::async_trait;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::keys;

/// Readable content of one artifact, opened fresh for every attempt.
pub type ArtifactContent = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Uploader abstraction trait
///
/// Every backend (form upload, S3, Google Cloud Storage, Artifactory) implements this
/// trait. One instance serves a whole batch and is shared by all upload workers, so
/// implementations must be stateless apart from their connection pools.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Transmit the artifact's bytes and return backend-assigned metadata.
    ///
    /// A returned error is classified transient or permanent; the caller decides
    /// whether to try again with a fresh `content` reader.
    async fn upload(
        &self,
        artifact: &Artifact,
        content: ArtifactContent,
    ) -> Result<UploadResult, UploadError>;

    /// Path prefix under which every artifact of the batch is stored.
    fn key_prefix(&self) -> String;

    /// Backend type, for logging and diagnostics.
    fn kind(&self) -> BackendKind;

    /// Final key for an artifact: `{key_prefix}/{artifact.path}`.
    fn object_key(&self, artifact: &Artifact) -> String {
        keys::object_key(&self.key_prefix(), &artifact.path)
    }
}

/// Read an artifact's content fully, checking it still has the resolved size.
///
/// A size mismatch means the file changed after its checksum was taken; that is
/// reported as permanent since retrying would upload different bytes.
pub async fn read_content(
    artifact: &Artifact,
    mut content: ArtifactContent,
) -> Result<Vec<u8>, UploadError> {
    let mut buffer = Vec::with_capacity(artifact.file_size as usize);
    content.read_to_end(&mut buffer).await?;

    if buffer.len() as u64 != artifact.file_size {
        return Err(UploadError::Permanent(format!(
            "{} changed since it was resolved: expected {} bytes, read {}",
            artifact.path,
            artifact.file_size,
            buffer.len()
        )));
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(bytes: &'static [u8]) -> ArtifactContent {
        Box::pin(std::io::Cursor::new(bytes))
    }

    #[tokio::test]
    async fn read_content_returns_all_bytes() {
        let artifact = Artifact::new("/w/a.txt", "a.txt", 5, "sum", "text/plain");
        let data = read_content(&artifact, content(b"hello")).await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn read_content_rejects_changed_files() {
        let artifact = Artifact::new("/w/a.txt", "a.txt", 3, "sum", "text/plain");
        let err = read_content(&artifact, content(b"hello")).await.unwrap_err();
        assert!(matches!(err, UploadError::Permanent(_)));
    }
}
