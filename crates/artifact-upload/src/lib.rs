//! Upload pipeline for artifact-agent
//!
//! Turns a glob pattern into registered [`Artifact`](artifact_core::Artifact)s and
//! pushes them through a bounded pool of workers to the selected backend.
//!
//! ```text
//! pattern --PathResolver--> artifacts --UploadOrchestrator--> BatchResult
//!                              |                    |
//!                   ContentTypeResolver     ArtifactRegistry + Uploader
//! ```

pub mod content_type;
pub mod orchestrator;
pub mod resolver;
pub mod retry;

pub use content_type::ContentTypeResolver;
pub use orchestrator::UploadOrchestrator;
pub use resolver::PathResolver;
pub use retry::RetryPolicy;
