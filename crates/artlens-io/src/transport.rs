//! HTTP transport to the analysis backend.
//!
//! One-shot calls (`upload`, `get_stats`, `models_ready`) return a
//! [`TransportError`] for any non-success response, carrying the
//! response's status text. Progress polling never fails: an unknown task
//! and an unreachable backend both mean "nothing to show yet", and
//! [`Transport::get_progress`] collapses them to `None`.
//! [`Transport::fetch_progress`] keeps the distinction for callers that
//! want it.
//!
//! Built on `reqwest`, which uses the browser's fetch API on wasm32.

use artlens_core::{AggregateStats, ClientConfig, ConfigError, ModelsStatus, UploadResponse};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

/// Errors from one-shot backend calls.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `POST /upload` answered with a non-success status.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// `GET /stats` answered with a non-success status.
    #[error("Failed to fetch stats: {0}")]
    Stats(String),

    /// `GET /ready_models` answered with a non-success status.
    #[error("Failed to fetch model status: {0}")]
    Models(String),

    /// The request could not be sent or its body could not be decoded.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result of one progress request, keeping apart the two kinds of
/// "nothing yet".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressFetch {
    /// The backend returned a progress payload.
    Found(Value),
    /// The backend answered but has no such task (not registered yet or
    /// expired).
    Absent {
        /// HTTP status of the response.
        status: u16,
    },
    /// The request failed before a usable response arrived.
    Unreachable(String),
}

impl ProgressFetch {
    /// Collapse to the poll contract: a payload, or `None` to retry.
    #[must_use]
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent { .. } | Self::Unreachable(_) => None,
        }
    }
}

/// Status text for a response, e.g. `"Not Found"`.
///
/// This is the canonical reason phrase for the status code, not the
/// phrase the server put on its status line; reqwest does not expose
/// that one. Codes without a canonical phrase are shown as digits.
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_owned(), str::to_owned)
}

/// Client for the backend's HTTP surface.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base: String,
}

impl Transport {
    /// Create a transport for the backend at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Config`] if the config fails validation
    /// and [`TransportError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.request_timeout());
        Ok(Self {
            client: builder.build()?,
            base: config.base().to_owned(),
        })
    }

    /// Backend origin this transport talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Resolve a server-relative path (such as a HOG image URL) to an
    /// absolute URL on the backend.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        artlens_core::resolve_url(Some(&self.base), path)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Upload an image and start an analysis task.
    ///
    /// The file is sent as the multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Upload`] with the status text if the
    /// backend rejects the upload, or [`TransportError::Request`] if the
    /// request fails or the response is not a `{task_id}` object.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        mime: &str,
    ) -> Result<UploadResponse, TransportError> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_owned())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Upload(status_text(status)));
        }
        let upload: UploadResponse = response.json().await?;
        tracing::info!(task_id = %upload.task_id, filename, "upload accepted");
        Ok(upload)
    }

    /// Fetch the progress payload of a task.
    ///
    /// Returns `None` when the task is unknown or the backend cannot be
    /// reached; the caller retries on its next tick either way.
    pub async fn get_progress(&self, task_id: &str) -> Option<Value> {
        self.fetch_progress(task_id).await.into_payload()
    }

    /// Fetch the progress payload of a task, reporting why nothing was
    /// returned.
    ///
    /// Network and decode failures are logged; a missing task is not.
    pub async fn fetch_progress(&self, task_id: &str) -> ProgressFetch {
        let url = self.endpoint(&format!("/progress/{task_id}"));
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(task_id, error = %e, "error fetching progress");
                return ProgressFetch::Unreachable(e.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(task_id, status = status.as_u16(), "progress not available");
            return ProgressFetch::Absent {
                status: status.as_u16(),
            };
        }

        match response.json::<Value>().await {
            Ok(payload) => ProgressFetch::Found(payload),
            Err(e) => {
                tracing::error!(task_id, error = %e, "error decoding progress");
                ProgressFetch::Unreachable(e.to_string())
            }
        }
    }

    /// Fetch aggregate statistics over all analyzed images.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stats`] with the status text on a
    /// non-success response, or [`TransportError::Request`] if the
    /// request or decoding fails.
    pub async fn get_stats(&self) -> Result<AggregateStats, TransportError> {
        let response = self.client.get(self.endpoint("/stats")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Stats(status_text(status)));
        }
        Ok(response.json().await?)
    }

    /// Whether the backend has finished loading its models.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Models`] with the status text on a
    /// non-success response, or [`TransportError::Request`] if the
    /// request or decoding fails.
    pub async fn models_ready(&self) -> Result<bool, TransportError> {
        let response = self
            .client
            .get(self.endpoint("/ready_models"))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Models(status_text(status)));
        }
        let models: ModelsStatus = response.json().await?;
        Ok(models.is_ready())
    }
}
