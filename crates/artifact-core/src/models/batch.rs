use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ArtifactError;
use crate::models::artifact::{Artifact, ArtifactState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    InProgress,
    Succeeded,
    PartiallyFailed,
}

/// The unit of a single upload invocation.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub job_id: String,
    /// Pattern the artifacts were resolved from, kept for diagnostics.
    pub pattern: String,
    /// Raw destination identifier; empty for the default backend.
    pub destination: String,
    pub artifacts: Vec<Artifact>,
    pub state: BatchState,
}

impl UploadBatch {
    pub fn new(job_id: impl Into<String>, destination: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            job_id: job_id.into(),
            pattern: String::new(),
            destination: destination.into(),
            artifacts,
            state: BatchState::InProgress,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn total_size(&self) -> u64 {
        self.artifacts.iter().map(|a| a.file_size).sum()
    }
}

/// Identifiers handed back by the orchestration service for a registered batch.
///
/// `artifact_ids` is index-aligned with the artifacts that were submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRegistration {
    pub batch_id: Uuid,
    pub artifact_ids: Vec<Uuid>,
}

/// A failed artifact and the error that ended its last attempt.
#[derive(Debug)]
pub struct ArtifactFailure {
    pub path: String,
    pub error: ArtifactError,
}

/// Outcome of an orchestrator run that got past batch registration.
#[derive(Debug)]
pub struct BatchResult {
    pub batch_id: Uuid,
    pub state: BatchState,
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ArtifactFailure>,
}

impl BatchResult {
    /// Build the result from terminal artifacts, deriving the batch state.
    pub fn from_artifacts(batch_id: Uuid, artifacts: Vec<Artifact>, failures: Vec<ArtifactFailure>) -> Self {
        let all_uploaded = artifacts
            .iter()
            .all(|a| a.state == ArtifactState::Uploaded);
        let state = if all_uploaded && failures.is_empty() {
            BatchState::Succeeded
        } else {
            BatchState::PartiallyFailed
        };

        Self {
            batch_id,
            state,
            artifacts,
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == BatchState::Succeeded
    }

    pub fn uploaded_count(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.state == ArtifactState::Uploaded)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::models::artifact::UploadResult;

    fn uploaded(path: &str) -> Artifact {
        let mut a = Artifact::new(format!("/w/{}", path), path, 3, "sum", "text/plain");
        a.mark_uploaded(UploadResult::new(path, None));
        a
    }

    #[test]
    fn all_uploaded_is_success() {
        let result = BatchResult::from_artifacts(Uuid::new_v4(), vec![uploaded("a"), uploaded("b")], vec![]);
        assert!(result.is_success());
        assert_eq!(result.uploaded_count(), 2);
    }

    #[test]
    fn any_failure_is_partial() {
        let mut failed = Artifact::new("/w/c", "c", 1, "sum", "text/plain");
        failed.mark_failed();
        let failures = vec![ArtifactFailure {
            path: "c".to_string(),
            error: ArtifactError::Upload {
                path: "c".to_string(),
                source: UploadError::Permanent("denied".to_string()),
            },
        }];
        let result = BatchResult::from_artifacts(Uuid::new_v4(), vec![uploaded("a"), failed], failures);
        assert_eq!(result.state, BatchState::PartiallyFailed);
        assert_eq!(result.uploaded_count(), 1);
    }

    #[test]
    fn total_size_sums_artifacts() {
        let batch = UploadBatch::new("job", "", vec![uploaded("a"), uploaded("b")]);
        assert_eq!(batch.total_size(), 6);
        assert_eq!(batch.state, BatchState::InProgress);
    }
}
