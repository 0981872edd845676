//! Error types module
//!
//! `ArtifactError` covers every way an upload run can fail. Fatal variants abort the
//! run with a single message; `Upload` and per-artifact `Registration` failures are
//! collected into the batch result instead.
//!
//! `UploadError` is what a backend uploader returns for one attempt. Its
//! transient/permanent split drives the retry policy.

use std::io;
use std::path::PathBuf;

/// Result type for pipeline operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("No files matched the pattern '{pattern}'. Check the path, and make sure the pattern is quoted so your shell does not expand it")]
    NoFilesMatched { pattern: String },

    #[error("'{}' and '{}' would both be uploaded as '{path}'", first.display(), second.display())]
    DuplicatePath {
        path: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid upload destination: '{destination}'. Only s3://, gs:// or rt:// upload destinations are allowed. Did you forget to surround your artifact upload pattern in double quotes?")]
    InvalidDestination { destination: String },

    #[error("Error creating uploader: {0}")]
    UploaderConstruction(String),

    #[error("Upload of '{path}' failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: UploadError,
    },

    #[error("Registration error: {message}")]
    Registration { message: String, transient: bool },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArtifactError {
    pub fn registration(message: impl Into<String>, transient: bool) -> Self {
        ArtifactError::Registration {
            message: message.into(),
            transient,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether repeating the failed operation could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ArtifactError::Upload { source, .. } => source.is_transient(),
            ArtifactError::Registration { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Short name of the pipeline stage that produced the error, used in diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            ArtifactError::NoFilesMatched { .. }
            | ArtifactError::DuplicatePath { .. }
            | ArtifactError::Io { .. } => "resolve",
            ArtifactError::InvalidDestination { .. } => "route",
            ArtifactError::UploaderConstruction(_) => "configure uploader",
            ArtifactError::Upload { .. } => "upload",
            ArtifactError::Registration { .. } => "register",
            ArtifactError::Config(_) => "configuration",
        }
    }
}

/// Failure of a single upload attempt
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Network failures, timeouts, throttling and 5xx responses.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// Authorization rejected, payload too large, malformed request.
    #[error("backend rejected upload: {0}")]
    Permanent(String),

    #[error("failed to read artifact content: {0}")]
    Read(#[from] io::Error),
}

impl UploadError {
    pub fn is_transient(&self) -> bool {
        matches!(self, UploadError::Transient(_))
    }

    /// Classify an HTTP status returned by a backend.
    ///
    /// 408, 429 and every 5xx are worth retrying; all other failures are not.
    pub fn from_status(status: u16, body: impl AsRef<str>) -> Self {
        let message = format!("HTTP {}: {}", status, body.as_ref().trim());
        if status == 408 || status == 429 || (500..600).contains(&status) {
            UploadError::Transient(message)
        } else {
            UploadError::Permanent(message)
        }
    }
}
