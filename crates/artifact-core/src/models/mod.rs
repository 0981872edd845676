//! Domain models for an upload run.

pub mod artifact;
pub mod batch;

pub use artifact::{Artifact, ArtifactState, UploadResult};
pub use batch::{ArtifactFailure, BatchRegistration, BatchResult, BatchState, UploadBatch};
