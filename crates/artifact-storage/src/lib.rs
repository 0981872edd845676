//! Artifact Storage Library
//!
//! Uploaders for every supported backend behind one [`Uploader`] trait, plus the
//! factory that picks one from a routed [`Destination`](artifact_core::Destination).
//!
//! # Key format
//!
//! Every backend stores an artifact under `{key_prefix}/{artifact path}`. The prefix
//! is the path component of the destination (`s3://bucket/{prefix}`), or the job id
//! for the default form uploader. Key generation lives in the `keys` module so all
//! backends stay consistent.

pub mod artifactory;
pub mod factory;
pub mod form;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
pub mod keys;
#[cfg(any(feature = "storage-s3", feature = "storage-gcs"))]
pub(crate) mod object;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use artifact_core::{BackendKind, UploadError};
pub use artifactory::ArtifactoryUploader;
pub use factory::{create_uploader, UploaderContext};
pub use form::FormUploader;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsUploader;
#[cfg(feature = "storage-s3")]
pub use s3::S3Uploader;
pub use traits::{read_content, ArtifactContent, Uploader};
