//! Helpers shared by the `object_store` backed uploaders (S3 and GCS).

use artifact_core::{Artifact, UploadError};
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, ClientOptions, Error as ObjectStoreError, ObjectStore, PutOptions,
    PutPayload,
};

/// Client options that send `header_name: value` with every request.
///
/// Used for canned ACLs, which `object_store` has no dedicated setting for.
pub(crate) fn client_options_with_header(
    header_name: &'static str,
    value: Option<&str>,
) -> Result<ClientOptions, String> {
    let options = ClientOptions::new();
    let Some(value) = value else {
        return Ok(options);
    };

    let mut headers = HeaderMap::new();
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| format!("invalid value for {}: {:?}", header_name, value))?;
    headers.insert(HeaderName::from_static(header_name), header_value);

    Ok(options.with_default_headers(headers))
}

/// Map an `object_store` failure onto the retry taxonomy.
///
/// `object_store` already retries requests internally; what reaches us as a generic
/// error is still worth another attempt, while auth and request-shape problems are not.
pub(crate) fn classify(err: ObjectStoreError) -> UploadError {
    match err {
        ObjectStoreError::PermissionDenied { .. }
        | ObjectStoreError::Unauthenticated { .. }
        | ObjectStoreError::Precondition { .. }
        | ObjectStoreError::AlreadyExists { .. }
        | ObjectStoreError::InvalidPath { .. }
        | ObjectStoreError::NotSupported { .. } => UploadError::Permanent(err.to_string()),
        other => UploadError::Transient(other.to_string()),
    }
}

/// Put one artifact's bytes under `key` with its content type.
pub(crate) async fn put_artifact(
    store: &dyn ObjectStore,
    key: &str,
    artifact: &Artifact,
    data: Vec<u8>,
) -> Result<(), UploadError> {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, artifact.content_type.clone().into());

    let options = PutOptions {
        attributes,
        ..PutOptions::default()
    };

    store
        .put_opts(&Path::from(key), PutPayload::from(Bytes::from(data)), options)
        .await
        .map(|_| ())
        .map_err(classify)
}
