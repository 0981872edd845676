//! Artifact Agent Core Library
//!
//! This crate provides the domain model, error taxonomy, destination routing and
//! configuration shared by every artifact-agent component.

pub mod config;
pub mod constants;
pub mod destination;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{AgentConfig, ArtifactorySettings, GcsSettings, RetrySettings, S3Settings};
pub use destination::{BackendKind, Destination, DestinationRouter};
pub use error::{ArtifactError, ArtifactResult, UploadError};
pub use models::{
    Artifact, ArtifactFailure, ArtifactState, BatchRegistration, BatchResult, BatchState,
    UploadBatch, UploadResult,
};
