//! Bundle submission transport.
//!
//! The draft hands its composed bundle to a [`BundleSubmitter`]. Production uses
//! [`HttpBundleSubmitter`] against the ingestion endpoint; [`InMemoryBundleSubmitter`] keeps
//! bundles in memory and can be told to fail.
//!
//! Submission is a single call. There is no retry here; a failed submission leaves the draft
//! with the caller.

use crate::constants::BUNDLE_UPLOAD_PATH;
use crate::http::ApiClient;
use crate::{EmrError, EmrResult};
use async_trait::async_trait;
use fhir::Bundle;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Acknowledgement from the ingestion endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[async_trait]
pub trait BundleSubmitter: Send + Sync {
    async fn submit(&self, bundle: &Bundle) -> EmrResult<SubmissionReceipt>;
}

/// Ingestion endpoint response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "id")]
    bundle_id: Option<String>,
}

/// Posts bundles to `{base}/bundles/upload`.
#[derive(Clone, Debug)]
pub struct HttpBundleSubmitter {
    client: ApiClient,
}

impl HttpBundleSubmitter {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BundleSubmitter for HttpBundleSubmitter {
    async fn submit(&self, bundle: &Bundle) -> EmrResult<SubmissionReceipt> {
        let response: UploadResponse = self
            .client
            .post_json(BUNDLE_UPLOAD_PATH, bundle)
            .await
            .map_err(|e| match e {
                EmrError::Transport(_) => e,
                other => EmrError::Transport(other.to_string()),
            })?;

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "ingestion endpoint rejected the bundle".into());
            tracing::warn!(%message, "bundle upload rejected");
            return Err(EmrError::Transport(message));
        }

        tracing::info!(
            bundle_id = response.bundle_id.as_deref().unwrap_or("-"),
            entries = bundle.entry.len(),
            "bundle uploaded"
        );
        Ok(SubmissionReceipt {
            bundle_id: response.bundle_id,
            message: response.message,
        })
    }
}

/// Keeps submitted bundles in memory.
#[derive(Debug, Default)]
pub struct InMemoryBundleSubmitter {
    submitted: Mutex<Vec<Bundle>>,
    failure: Option<String>,
}

impl InMemoryBundleSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A submitter that rejects every bundle with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            submitted: Mutex::default(),
            failure: Some(message.into()),
        }
    }

    pub async fn submitted(&self) -> Vec<Bundle> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl BundleSubmitter for InMemoryBundleSubmitter {
    async fn submit(&self, bundle: &Bundle) -> EmrResult<SubmissionReceipt> {
        if let Some(message) = &self.failure {
            return Err(EmrError::Transport(message.clone()));
        }

        let mut submitted = self.submitted.lock().await;
        submitted.push(bundle.clone());
        Ok(SubmissionReceipt {
            bundle_id: Some(format!("bundle-{}", submitted.len())),
            message: Some("Bundle stored".into()),
        })
    }
}
