//! Shared outbound HTTP client for the upstream EMR API.
//!
//! Every HTTP-backed seam (bundle submission, authentication, patient and doctor gateways)
//! goes through [`ApiClient`], which fixes the base URL, timeout and optional bearer token once.

use crate::config::CoreConfig;
use crate::{EmrError, EmrResult};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Error body shape used by the upstream API (`{"message": "..."}` or `{"detail": "..."}`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiClient {
    pub fn new(cfg: &CoreConfig) -> EmrResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.http_timeout())
            .build()
            .map_err(|e| EmrError::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.api_base_url().to_owned(),
            token: None,
        })
    }

    /// A copy of this client that sends `Authorization: Bearer <token>`.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> EmrResult<T> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(request).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> EmrResult<T> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> EmrResult<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

async fn check_status(response: Response) -> EmrResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_owned();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body
        .message
        .or(body.detail)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());

    tracing::warn!(%status, url = %url, message = %message, "upstream request failed");

    Err(match status {
        StatusCode::UNAUTHORIZED => EmrError::Unauthenticated,
        StatusCode::NOT_FOUND => EmrError::NotFound(message),
        _ => EmrError::Transport(format!("{status}: {message}")),
    })
}
