//! REST relay for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission (`POST /prompt`) and history retrieval
//! (`GET /history/{id}`) using [`reqwest`]. Every request carries
//! no-cache headers so no intermediary serves a stale queue or history
//! response. No retry or backoff exists here -- failures surface once per
//! call and callers poll again.

use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};

use crate::workflow::SubmissionPayload;

/// Opaque ComfyUI-issued identifier for a queued job.
///
/// The gateway never interprets its structure; it is only a lookup key
/// for later history polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
}

/// Errors from the ComfyUI REST relay.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUiApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The submit response was 2xx but carried no `prompt_id` field.
    #[error("ComfyUI response did not contain a prompt_id")]
    MissingPromptId,
}

/// HTTP relay client for a single ComfyUI instance.
pub struct ComfyUiApi {
    client: reqwest::Client,
    api_url: String,
}

impl ComfyUiApi {
    /// Create a new relay client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base HTTP API URL this relay talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Submit a patched workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the payload's graph and client
    /// tag. Returns the server-assigned job handle.
    pub async fn submit_workflow(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<JobHandle, ComfyUiApiError> {
        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .headers(no_cache_headers())
            .json(payload)
            .send()
            .await?;

        let body: serde_json::Value = Self::parse_response(response).await?;

        let job_id = body
            .get("prompt_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(ComfyUiApiError::MissingPromptId)?
            .to_string();

        tracing::debug!(job_id = %job_id, client_id = payload.client_id, "Workflow queued");

        Ok(JobHandle { job_id })
    }

    /// Retrieve execution history for a specific job.
    ///
    /// Sends a `GET /history/{job_id}` request. The returned JSON maps the
    /// job id to its status record and per-node outputs; an empty object
    /// means ComfyUI has no record yet.
    pub async fn get_history(&self, job_id: &str) -> Result<serde_json::Value, ComfyUiApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, job_id))
            .headers(no_cache_headers())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUiApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUiApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUiApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUiApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Headers instructing ComfyUI and any intermediary to treat the
/// request/response as non-cacheable.
fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cache_headers_cover_all_intermediaries() {
        let headers = no_cache_headers();
        assert_eq!(
            headers.get(CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(headers.get(EXPIRES).unwrap(), "0");
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let api = ComfyUiApi::new("http://localhost:8188/".into());
        assert_eq!(api.api_url(), "http://localhost:8188");
    }
}
