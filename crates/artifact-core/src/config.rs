//! Configuration module
//!
//! Agent configuration is read from the environment (with `.env` support). Backend
//! credentials live here so uploaders never read the environment themselves.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_MAX_MS,
    DEFAULT_S3_ACL, DEFAULT_S3_REGION, DEFAULT_UPLOAD_CONCURRENCY, DEFAULT_UPLOAD_MAX_ATTEMPTS,
};
use crate::error::{ArtifactError, ArtifactResult};

/// S3 credentials and object settings
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: String,
    /// Canned ACL applied to every uploaded object.
    pub acl: String,
    // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub endpoint: Option<String>,
}

/// Google Cloud Storage settings
#[derive(Clone, Debug, Default)]
pub struct GcsSettings {
    pub application_credentials: Option<String>,
    pub acl: Option<String>,
}

/// Artifactory settings
#[derive(Clone, Debug, Default)]
pub struct ArtifactorySettings {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Per-artifact retry budget and backoff bounds
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_UPLOAD_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
        }
    }
}

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Destination used when the command line does not name one.
    pub upload_destination: Option<String>,
    pub upload_concurrency: usize,
    pub retry: RetrySettings,
    pub http_timeout: Duration,
    pub s3: S3Settings,
    pub gcs: GcsSettings,
    pub artifactory: ArtifactorySettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            upload_destination: None,
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            retry: RetrySettings::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            s3: S3Settings {
                region: DEFAULT_S3_REGION.to_string(),
                acl: DEFAULT_S3_ACL.to_string(),
                ..S3Settings::default()
            },
            gcs: GcsSettings::default(),
            artifactory: ArtifactorySettings::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> ArtifactResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> ArtifactResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse_num = |key: &str, default: u64| parse_number(key, get(key), default);

        let config = AgentConfig {
            endpoint: get("ARTIFACT_AGENT_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            access_token: get("ARTIFACT_AGENT_ACCESS_TOKEN"),
            upload_destination: get("ARTIFACT_AGENT_UPLOAD_DESTINATION"),
            upload_concurrency: parse_number(
                "ARTIFACT_AGENT_UPLOAD_CONCURRENCY",
                get("ARTIFACT_AGENT_UPLOAD_CONCURRENCY"),
                DEFAULT_UPLOAD_CONCURRENCY,
            )?,
            retry: RetrySettings {
                max_attempts: parse_number(
                    "ARTIFACT_AGENT_UPLOAD_MAX_ATTEMPTS",
                    get("ARTIFACT_AGENT_UPLOAD_MAX_ATTEMPTS"),
                    DEFAULT_UPLOAD_MAX_ATTEMPTS,
                )?,
                base_delay: Duration::from_millis(parse_num(
                    "ARTIFACT_AGENT_UPLOAD_RETRY_BASE_MS",
                    DEFAULT_RETRY_BASE_MS,
                )?),
                max_delay: Duration::from_millis(parse_num(
                    "ARTIFACT_AGENT_UPLOAD_RETRY_MAX_MS",
                    DEFAULT_RETRY_MAX_MS,
                )?),
            },
            http_timeout: Duration::from_secs(parse_num(
                "ARTIFACT_AGENT_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            s3: S3Settings {
                access_key_id: get("ARTIFACT_AGENT_S3_ACCESS_KEY_ID"),
                secret_access_key: get("ARTIFACT_AGENT_S3_SECRET_ACCESS_KEY"),
                session_token: get("ARTIFACT_AGENT_S3_SESSION_TOKEN"),
                region: get("ARTIFACT_AGENT_S3_DEFAULT_REGION")
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                acl: get("ARTIFACT_AGENT_S3_ACL").unwrap_or_else(|| DEFAULT_S3_ACL.to_string()),
                endpoint: get("ARTIFACT_AGENT_S3_ENDPOINT"),
            },
            gcs: GcsSettings {
                application_credentials: get("ARTIFACT_AGENT_GS_APPLICATION_CREDENTIALS"),
                acl: get("ARTIFACT_AGENT_GS_ACL"),
            },
            artifactory: ArtifactorySettings {
                url: get("ARTIFACT_AGENT_ARTIFACTORY_URL"),
                user: get("ARTIFACT_AGENT_ARTIFACTORY_USER"),
                password: get("ARTIFACT_AGENT_ARTIFACTORY_PASSWORD"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ArtifactResult<()> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ArtifactError::Config(format!(
                "ARTIFACT_AGENT_ENDPOINT must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.upload_concurrency == 0 {
            return Err(ArtifactError::Config(
                "ARTIFACT_AGENT_UPLOAD_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ArtifactError::Config(
                "ARTIFACT_AGENT_UPLOAD_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.retry.base_delay > self.retry.max_delay {
            return Err(ArtifactError::Config(
                "ARTIFACT_AGENT_UPLOAD_RETRY_BASE_MS must not exceed ARTIFACT_AGENT_UPLOAD_RETRY_MAX_MS"
                    .to_string(),
            ));
        }

        if let Some(url) = &self.artifactory.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ArtifactError::Config(format!(
                    "ARTIFACT_AGENT_ARTIFACTORY_URL must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }

        Ok(())
    }
}

/// Parse a numeric setting. Values that do not fit the target type are rejected.
fn parse_number<T: FromStr>(key: &str, raw: Option<String>, default: T) -> ArtifactResult<T> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| {
            ArtifactError::Config(format!("{} must be a valid number, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
