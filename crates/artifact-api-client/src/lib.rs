//! Shared HTTP client for the orchestration service.
//!
//! Provides a minimal client with bearer-token auth, generic JSON/multipart helpers,
//! and the artifact endpoints (batch registration, status updates, form uploads).
//! The upload pipeline talks to it through the [`ArtifactRegistry`] trait.

pub mod api;
pub mod registry;

use anyhow::{Context, Result};
use artifact_core::AgentConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use api::{
    ArtifactPayload, CreateArtifactsRequest, CreateArtifactsResponse, FormUploadResponse,
    UpdateArtifactRequest,
};
pub use registry::ArtifactRegistry;

/// API version prefix used for every endpoint.
pub const API_PREFIX: &str = "/v3";

/// Non-success HTTP response from the orchestration service.
///
/// Carried inside `anyhow::Error` so callers can downcast and decide whether to retry.
#[derive(Debug, thiserror::Error)]
#[error("API request failed with status {status}: {body}")]
pub struct ApiStatusError {
    pub status: u16,
    pub body: String,
}

impl ApiStatusError {
    pub fn is_transient(&self) -> bool {
        self.status == 408 || self.status == 429 || self.status >= 500
    }
}

/// HTTP client for the orchestration service.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl ApiClient {
    pub fn new(base_url: String, access_token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Create a client from agent configuration. The access token is required.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let token = config
            .access_token
            .clone()
            .context("Missing agent access token. Set ARTIFACT_AGENT_ACCESS_TOKEN or pass --agent-access-token")?;

        Self::new(config.endpoint.clone(), token, config.http_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiStatusError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.build_url(path)).json(body);
        let response = self.send(request).await?;
        Self::parse(response).await
    }

    /// PUT JSON body. The response body is ignored.
    pub async fn put_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let request = self.client.put(self.build_url(path)).json(body);
        self.send(request).await?;
        Ok(())
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let request = self.client.post(self.build_url(path)).multipart(form);
        let response = self.send(request).await?;
        Self::parse(response).await
    }
}

/// Whether an error returned by [`ApiClient`] is worth retrying.
///
/// Network failures and 408/429/5xx responses are; everything else is not.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    if let Some(status) = err.downcast_ref::<ApiStatusError>() {
        return status.is_transient();
    }
    if let Some(req) = err.downcast_ref::<reqwest::Error>() {
        return req.is_timeout() || req.is_connect() || req.is_request();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_trims_trailing_slash() {
        let client = ApiClient::new(
            "http://localhost:3000/".to_string(),
            "token".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.build_url("/v3/x"), "http://localhost:3000/v3/x");
    }

    #[test]
    fn from_config_requires_token() {
        let config = AgentConfig::default();
        assert!(ApiClient::from_config(&config).is_err());

        let config = AgentConfig {
            access_token: Some("secret".to_string()),
            ..AgentConfig::default()
        };
        assert!(ApiClient::from_config(&config).is_ok());
    }

    #[test]
    fn status_errors_classify_transience() {
        let transient: anyhow::Error = ApiStatusError {
            status: 502,
            body: "bad gateway".to_string(),
        }
        .into();
        assert!(is_transient_error(&transient));

        let permanent: anyhow::Error = ApiStatusError {
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into();
        assert!(!is_transient_error(&permanent));

        assert!(!is_transient_error(&anyhow::anyhow!("parse failure")));
    }
}
