//! Destination routing
//!
//! A destination identifier selects the storage backend and its location. The
//! scheme is matched by literal prefix in a fixed order; anything else is rejected
//! before any file is touched.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::{ArtifactError, ArtifactResult};

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Multipart upload to the orchestration service.
    Default,
    S3,
    Gcs,
    Artifactory,
}

impl BackendKind {
    /// Prefixes checked in order; the first match wins.
    const SCHEMES: [(&'static str, BackendKind); 3] = [
        ("s3://", BackendKind::S3),
        ("gs://", BackendKind::Gcs),
        ("rt://", BackendKind::Artifactory),
    ];

    pub fn scheme(&self) -> Option<&'static str> {
        Self::SCHEMES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(scheme, _)| *scheme)
    }
}

impl FromStr for BackendKind {
    type Err = ArtifactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(BackendKind::Default),
            "s3" => Ok(BackendKind::S3),
            "gs" | "gcs" => Ok(BackendKind::Gcs),
            "rt" | "artifactory" => Ok(BackendKind::Artifactory),
            _ => Err(ArtifactError::Config(format!("Invalid backend kind: {}", s))),
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BackendKind::Default => write!(f, "default"),
            BackendKind::S3 => write!(f, "s3"),
            BackendKind::Gcs => write!(f, "gcs"),
            BackendKind::Artifactory => write!(f, "artifactory"),
        }
    }
}

/// A classified destination.
///
/// For `s3://bucket/some/prefix`, `container` is `bucket` and `prefix` is
/// `some/prefix`. The default backend has neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub kind: BackendKind,
    pub raw: String,
    pub container: String,
    pub prefix: String,
}

impl Destination {
    pub fn default_backend() -> Self {
        Self {
            kind: BackendKind::Default,
            raw: String::new(),
            container: String::new(),
            prefix: String::new(),
        }
    }

    /// Classify a non-empty destination identifier.
    pub fn parse(raw: &str) -> ArtifactResult<Self> {
        let invalid = || ArtifactError::InvalidDestination {
            destination: raw.to_string(),
        };

        let (scheme, kind) = BackendKind::SCHEMES
            .iter()
            .find(|(scheme, _)| raw.starts_with(scheme))
            .ok_or_else(invalid)?;

        let location = &raw[scheme.len()..];
        let (container, prefix) = match location.split_once('/') {
            Some((container, prefix)) => (container, prefix.trim_matches('/')),
            None => (location, ""),
        };

        if container.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            kind: *kind,
            raw: raw.to_string(),
            container: container.to_string(),
            prefix: prefix.to_string(),
        })
    }

    pub fn is_default(&self) -> bool {
        self.kind == BackendKind::Default
    }
}

/// Picks the destination for a batch from the CLI argument and configuration.
#[derive(Debug, Clone, Default)]
pub struct DestinationRouter {
    configured: Option<String>,
}

impl DestinationRouter {
    /// `configured` is the destination supplied by configuration, used only when
    /// no explicit destination is given.
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn route(&self, explicit: Option<&str>) -> ArtifactResult<Destination> {
        let chosen = explicit
            .filter(|s| !s.trim().is_empty())
            .or(self.configured.as_deref());

        match chosen {
            None => Ok(Destination::default_backend()),
            Some(raw) => Destination::parse(raw.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_destinations_use_default_backend() {
        let router = DestinationRouter::new(None);
        assert_eq!(router.route(None).unwrap().kind, BackendKind::Default);
        assert_eq!(router.route(Some("")).unwrap().kind, BackendKind::Default);

        let router = DestinationRouter::new(Some("  ".to_string()));
        assert!(router.route(None).unwrap().is_default());
    }

    #[test]
    fn classifies_by_prefix() {
        let router = DestinationRouter::default();
        assert_eq!(router.route(Some("s3://bucket/p")).unwrap().kind, BackendKind::S3);
        assert_eq!(router.route(Some("gs://bucket/p")).unwrap().kind, BackendKind::Gcs);
        assert_eq!(
            router.route(Some("rt://repo/p")).unwrap().kind,
            BackendKind::Artifactory
        );
    }

    #[test]
    fn rejects_unknown_schemes_naming_the_string() {
        let router = DestinationRouter::default();
        for raw in ["ftp://host/path", "log/b.log", "S3://bucket", "https://x", "s3:/bucket"] {
            match router.route(Some(raw)) {
                Err(ArtifactError::InvalidDestination { destination }) => {
                    assert_eq!(destination, raw)
                }
                other => panic!("expected InvalidDestination for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn explicit_destination_overrides_configured() {
        let router = DestinationRouter::new(Some("gs://configured/x".to_string()));
        let dest = router.route(Some("s3://explicit/y")).unwrap();
        assert_eq!(dest.kind, BackendKind::S3);
        assert_eq!(dest.container, "explicit");

        let dest = router.route(None).unwrap();
        assert_eq!(dest.kind, BackendKind::Gcs);
        assert_eq!(dest.container, "configured");
    }

    #[test]
    fn invalid_configured_destination_is_rejected_when_used() {
        let router = DestinationRouter::new(Some("ftp://nope".to_string()));
        assert!(matches!(
            router.route(None),
            Err(ArtifactError::InvalidDestination { .. })
        ));
        assert!(router.route(Some("s3://ok")).is_ok());
    }

    #[test]
    fn splits_container_and_prefix() {
        let dest = Destination::parse("s3://bucket/prefix/nested/").unwrap();
        assert_eq!(dest.container, "bucket");
        assert_eq!(dest.prefix, "prefix/nested");

        let dest = Destination::parse("rt://repo").unwrap();
        assert_eq!(dest.container, "repo");
        assert_eq!(dest.prefix, "");
    }

    #[test]
    fn missing_container_is_invalid() {
        assert!(matches!(
            Destination::parse("s3://"),
            Err(ArtifactError::InvalidDestination { .. })
        ));
        assert!(matches!(
            Destination::parse("gs:///prefix"),
            Err(ArtifactError::InvalidDestination { .. })
        ));
    }

    #[test]
    fn backend_kind_round_trips_through_display() {
        for kind in [BackendKind::Default, BackendKind::S3, BackendKind::Gcs, BackendKind::Artifactory] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
        assert_eq!(BackendKind::S3.scheme(), Some("s3://"));
        assert_eq!(BackendKind::Default.scheme(), None);
    }
}
