//! HTTP client with built-in retry logic and error classification.

use log::debug;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::retry::{
    BackoffPolicy, Sleeper, TokioSleeper, classify_status, classify_transport_error, with_retry,
};
use crate::error::ApiError;

/// JSON-over-HTTP client bound to one upstream base URL.
///
/// Cloning is cheap; clones share the connection pool and hold no per-call state.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy: BackoffPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Performs a POST with a JSON body and deserializes the JSON response.
    /// Automatically retries on rate limits and transient network errors.
    #[tracing::instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("POST JSON to {}...", url);

        let operation_name = format!("POST {}", path);
        with_retry(&self.policy, self.sleeper.as_ref(), &operation_name, || {
            self.post_json_once(&url, body)
        })
        .await
    }

    /// Single attempt without retry.
    async fn post_json_once<B, T>(&self, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        // A body cut short or stalled past the timeout is a network failure, not bad JSON.
        let status = response.status();
        let body = response.bytes().await.map_err(classify_transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &String::from_utf8_lossy(&body)));
        }

        serde_json::from_slice(&body)
            .map_err(|e| ApiError::UpstreamServerError(format!("Malformed response: {}", e)))
    }
}
