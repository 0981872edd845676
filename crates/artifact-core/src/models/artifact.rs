use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of a single artifact within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl ArtifactState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ArtifactState::Uploaded | ArtifactState::Failed)
    }
}

impl Display for ArtifactState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArtifactState::Pending => write!(f, "pending"),
            ArtifactState::Uploading => write!(f, "uploading"),
            ArtifactState::Uploaded => write!(f, "uploaded"),
            ArtifactState::Failed => write!(f, "failed"),
        }
    }
}

/// Backend-assigned metadata for a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Final object key (or repository path) the backend stored the bytes under.
    pub key: String,
    /// Public or backend URL, when the backend exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadResult {
    pub fn new(key: impl Into<String>, url: Option<String>) -> Self {
        Self {
            key: key.into(),
            url,
            uploaded_at: Utc::now(),
        }
    }
}

/// One file to be uploaded.
///
/// Size and checksum are fixed at construction; only `state`, `upload` and the
/// registration `id` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Identifier assigned by the orchestration service at batch registration.
    pub id: Option<Uuid>,
    /// `/`-separated path relative to the resolution root; unique within a batch.
    pub path: String,
    pub absolute_path: PathBuf,
    pub file_size: u64,
    pub content_type: String,
    /// Hex-encoded SHA-256 of the file content.
    pub sha256sum: String,
    pub state: ArtifactState,
    pub upload: Option<UploadResult>,
}

impl Artifact {
    pub fn new(
        absolute_path: impl Into<PathBuf>,
        path: impl Into<String>,
        file_size: u64,
        sha256sum: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            path: path.into(),
            absolute_path: absolute_path.into(),
            file_size,
            content_type: content_type.into(),
            sha256sum: sha256sum.into(),
            state: ArtifactState::Pending,
            upload: None,
        }
    }

    pub fn mark_uploaded(&mut self, result: UploadResult) {
        self.state = ArtifactState::Uploaded;
        self.upload = Some(result);
    }

    pub fn mark_failed(&mut self) {
        self.state = ArtifactState::Failed;
        self.upload = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_artifact_is_pending_without_metadata() {
        let artifact = Artifact::new("/work/log/a.log", "log/a.log", 12, "abc", "text/plain");
        assert_eq!(artifact.state, ArtifactState::Pending);
        assert!(artifact.upload.is_none());
        assert!(artifact.id.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(ArtifactState::Uploaded.is_terminal());
        assert!(ArtifactState::Failed.is_terminal());
        assert!(!ArtifactState::Uploading.is_terminal());
        assert!(!ArtifactState::Pending.is_terminal());
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&ArtifactState::Uploaded).unwrap();
        assert_eq!(json, "\"uploaded\"");
    }

    #[test]
    fn marking_failed_clears_metadata() {
        let mut artifact = Artifact::new("/a", "a", 1, "x", "text/plain");
        artifact.mark_uploaded(UploadResult::new("job/a", None));
        assert_eq!(artifact.state, ArtifactState::Uploaded);
        artifact.mark_failed();
        assert_eq!(artifact.state, ArtifactState::Failed);
        assert!(artifact.upload.is_none());
    }
}
