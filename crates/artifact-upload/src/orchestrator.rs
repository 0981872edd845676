//! Batch upload orchestration
//!
//! A run registers the whole batch with the orchestration service, then uploads the
//! artifacts with a fixed number of workers. Workers claim artifact indices from a
//! shared cursor, so each artifact is handled by exactly one worker. A worker stores
//! each outcome in that artifact's slot as soon as it is reported, and the outcomes
//! are applied to the artifacts once every worker has finished.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use artifact_api_client::ArtifactRegistry;
use artifact_core::{
    AgentConfig, Artifact, ArtifactError, ArtifactFailure, ArtifactResult, ArtifactState,
    BatchResult, UploadBatch, UploadError, UploadResult,
};
use artifact_storage::{ArtifactContent, Uploader};
use futures::FutureExt;

use crate::retry::RetryPolicy;

type Outcome = Result<UploadResult, ArtifactError>;

/// Drives an [`UploadBatch`] through registration, upload and status reporting.
pub struct UploadOrchestrator {
    registry: Arc<dyn ArtifactRegistry>,
    concurrency: usize,
    retry: RetryPolicy,
}

impl UploadOrchestrator {
    pub fn new(registry: Arc<dyn ArtifactRegistry>, concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
            retry,
        }
    }

    pub fn from_config(registry: Arc<dyn ArtifactRegistry>, config: &AgentConfig) -> Self {
        Self::new(
            registry,
            config.upload_concurrency,
            RetryPolicy::from(&config.retry),
        )
    }

    /// Upload every artifact in `batch` with `uploader`.
    ///
    /// Returns an error only when the run cannot start: an empty batch or a failed
    /// batch registration. Per-artifact failures end up in the returned
    /// [`BatchResult`] and never stop the other uploads.
    pub async fn run(
        &self,
        batch: UploadBatch,
        uploader: Arc<dyn Uploader>,
    ) -> ArtifactResult<BatchResult> {
        if batch.artifacts.is_empty() {
            return Err(ArtifactError::NoFilesMatched {
                pattern: batch.pattern,
            });
        }

        let UploadBatch {
            job_id,
            mut artifacts,
            ..
        } = batch;

        let registration = self
            .registry
            .create_artifact_batch(&job_id, &artifacts)
            .await?;

        for (artifact, id) in artifacts.iter_mut().zip(registration.artifact_ids) {
            artifact.id = Some(id);
            artifact.state = ArtifactState::Uploading;
        }

        let total = artifacts.len();
        let workers = self.concurrency.min(total);
        let start = Instant::now();

        tracing::info!(
            batch_id = %registration.batch_id,
            backend = %uploader.kind(),
            artifacts = total,
            workers = workers,
            "Uploading artifacts"
        );

        let context = Arc::new(WorkerContext {
            outcomes: (0..total).map(|_| Mutex::new(None)).collect(),
            artifacts: Arc::new(artifacts),
            cursor: AtomicUsize::new(0),
            registry: self.registry.clone(),
            uploader,
            retry: self.retry.clone(),
        });

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let context = context.clone();
            handles.push(tokio::spawn(async move { context.run_worker().await }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Upload worker terminated unexpectedly");
            }
        }

        let outcomes: Vec<Option<Outcome>> = context
            .outcomes
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).take())
            .collect();
        let artifacts = match Arc::try_unwrap(context) {
            Ok(context) => Arc::try_unwrap(context.artifacts).unwrap_or_else(|a| (*a).clone()),
            Err(context) => (*context.artifacts).clone(),
        };

        let mut finished = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (mut artifact, outcome) in artifacts.into_iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                Err(ArtifactError::Upload {
                    path: artifact.path.clone(),
                    source: UploadError::Permanent("upload worker terminated".to_string()),
                })
            });
            match outcome {
                Ok(result) => artifact.mark_uploaded(result),
                Err(error) => {
                    artifact.mark_failed();
                    failures.push(ArtifactFailure {
                        path: artifact.path.clone(),
                        error,
                    });
                }
            }
            finished.push(artifact);
        }

        let result = BatchResult::from_artifacts(registration.batch_id, finished, failures);

        tracing::info!(
            batch_id = %result.batch_id,
            state = ?result.state,
            uploaded = result.uploaded_count(),
            failed = result.failures.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifact batch finished"
        );

        Ok(result)
    }
}

/// State shared by all workers of one run. Artifacts are read-only here; each
/// outcome slot is written once, by the worker that claimed its index.
struct WorkerContext {
    artifacts: Arc<Vec<Artifact>>,
    outcomes: Vec<Mutex<Option<Outcome>>>,
    cursor: AtomicUsize,
    registry: Arc<dyn ArtifactRegistry>,
    uploader: Arc<dyn Uploader>,
    retry: RetryPolicy,
}

impl WorkerContext {
    async fn run_worker(&self) {
        loop {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed);
            let (Some(artifact), Some(slot)) = (self.artifacts.get(index), self.outcomes.get(index))
            else {
                break;
            };

            let outcome = self.upload_with_retry(artifact).await;
            let outcome = self.report(artifact, outcome).await;
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        }
    }

    /// One upload attempt. A panicking uploader fails the attempt permanently.
    async fn attempt(
        &self,
        artifact: &Artifact,
        content: ArtifactContent,
    ) -> Result<UploadResult, UploadError> {
        match AssertUnwindSafe(self.uploader.upload(artifact, content))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(UploadError::Permanent(format!(
                "uploader panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    async fn upload_with_retry(&self, artifact: &Artifact) -> Outcome {
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Re-open on every attempt; a failed attempt may have consumed the stream.
            let result = match tokio::fs::File::open(&artifact.absolute_path).await {
                Ok(file) => {
                    let content: ArtifactContent = Box::pin(file);
                    self.attempt(artifact, content).await
                }
                Err(e) => Err(UploadError::Read(e)),
            };

            match result {
                Ok(result) => {
                    tracing::debug!(
                        path = %artifact.path,
                        key = %result.key,
                        attempt = attempt,
                        "Artifact uploaded"
                    );
                    return Ok(result);
                }
                Err(error) if self.retry.should_retry(attempt, &error) => {
                    let backoff = self.retry.backoff(attempt);
                    tracing::warn!(
                        path = %artifact.path,
                        attempt = attempt,
                        max_attempts = self.retry.max_attempts(),
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Artifact upload failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(error) => {
                    tracing::error!(
                        path = %artifact.path,
                        attempt = attempt,
                        error = %error,
                        "Artifact upload failed"
                    );
                    return Err(ArtifactError::Upload {
                        path: artifact.path.clone(),
                        source: error,
                    });
                }
            }
        }
    }

    /// Report the terminal state of one artifact. A failed report fails the artifact.
    async fn report(&self, artifact: &Artifact, outcome: Outcome) -> Outcome {
        let Some(id) = artifact.id else {
            return Err(ArtifactError::registration(
                format!("{} was not registered", artifact.path),
                false,
            ));
        };

        let reported = match outcome {
            Ok(ref result) => {
                self.registry
                    .update_artifact_status(id, ArtifactState::Uploaded, Some(result))
                    .await
            }
            Err(_) => {
                self.registry
                    .update_artifact_status(id, ArtifactState::Failed, None)
                    .await
            }
        };

        match (outcome, reported) {
            (outcome, Ok(())) => outcome,
            (Ok(_), Err(error)) => {
                tracing::error!(
                    path = %artifact.path,
                    artifact_id = %id,
                    error = %error,
                    "Failed to report uploaded artifact"
                );
                Err(error)
            }
            (Err(error), Err(report_error)) => {
                tracing::warn!(
                    path = %artifact.path,
                    artifact_id = %id,
                    error = %report_error,
                    "Failed to report failed artifact"
                );
                Err(error)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
