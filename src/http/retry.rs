//! Retry logic for upstream calls with error classification and capped exponential backoff.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

use crate::error::{ApiError, ErrorKind};

/// Maximum number of retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Delay before the first retry in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for any single backoff delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Longest upstream error body carried into an [`ApiError`].
const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry(Duration),
    GiveUp,
}

/// Deterministic capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            max_retries: MAX_RETRIES,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
        }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// `base * 2^n`, saturating, never above the ceiling.
    pub fn delay_for(&self, n: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(n))
            .min(self.max_delay)
    }

    /// Decides whether the call should be re-attempted after `n` retries failed with `kind`.
    pub fn decide(&self, n: u32, kind: ErrorKind) -> Decision {
        if !kind.is_retryable() || n >= self.max_retries {
            return Decision::GiveUp;
        }
        Decision::Retry(self.delay_for(n))
    }
}

/// Lifecycle of one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Init,
    Attempting,
    Retrying,
    Success,
    Failed,
}

/// Transient bookkeeping for a single logical call. Never outlives [`with_retry`].
#[derive(Debug)]
pub struct RetryState {
    state: CallState,
    retries: u32,
    last_error: Option<ErrorKind>,
    last_delay: Option<Duration>,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            state: CallState::Init,
            retries: 0,
            last_error: None,
            last_delay: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    fn begin_attempt(&mut self) {
        debug_assert!(matches!(self.state, CallState::Init | CallState::Retrying));
        self.state = CallState::Attempting;
    }

    fn record_retry(&mut self, kind: ErrorKind, delay: Duration) {
        self.state = CallState::Retrying;
        self.last_error = Some(kind);
        self.last_delay = Some(delay);
        self.retries += 1;
    }

    fn succeed(&mut self) {
        self.state = CallState::Success;
    }

    fn fail(&mut self, kind: ErrorKind) {
        self.state = CallState::Failed;
        self.last_error = Some(kind);
    }
}

/// Suspends the current call between attempts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer. Cancel-safe: dropping the call drops the timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Executes an async operation, re-attempting per `policy` on retryable errors.
/// The last error is returned unchanged once the policy gives up.
pub async fn with_retry<F, Fut, T>(
    policy: &BackoffPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut state = RetryState::new();

    loop {
        state.begin_attempt();
        match operation().await {
            Ok(result) => {
                state.succeed();
                debug!(
                    "{}: succeeded after {} retries",
                    operation_name,
                    state.retries()
                );
                return Ok(result);
            }
            Err(e) => match policy.decide(state.retries(), e.kind()) {
                Decision::Retry(delay) => {
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name,
                        state.retries() + 1,
                        policy.max_retries() + 1,
                        e,
                        delay.as_millis()
                    );
                    state.record_retry(e.kind(), delay);
                    sleeper.sleep(delay).await;
                }
                Decision::GiveUp => {
                    state.fail(e.kind());
                    debug!(
                        "{}: giving up after {} retries: {}",
                        operation_name,
                        state.retries(),
                        e
                    );
                    return Err(e);
                }
            },
        }
    }
}

/// Classifies a non-success HTTP status and its body.
pub fn classify_status(status: StatusCode, body: &str) -> ApiError {
    let message = upstream_message(status, body);

    match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            if !mentions_rate_limit(body) =>
        {
            ApiError::Unauthorized(message)
        }
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ApiError::TransientNetwork(message)
        }
        s if s.is_client_error() && mentions_rate_limit(body) => ApiError::RateLimited(message),
        s if s.is_client_error() => ApiError::InvalidRequest(message),
        _ => ApiError::UpstreamServerError(message),
    }
}

/// Classifies a transport-level failure from reqwest.
pub fn classify_transport_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        return classify_status(status, "");
    }
    if error.is_timeout() || error.is_body() {
        return ApiError::TransientNetwork(error.to_string());
    }
    if error.is_decode() {
        return ApiError::UpstreamServerError(format!("Malformed response: {}", error));
    }
    if error.is_builder() {
        return ApiError::InvalidRequest(error.to_string());
    }
    // Connect failures, timeouts, resets and truncated bodies can all be retried.
    ApiError::TransientNetwork(error.to_string())
}

fn mentions_rate_limit(body: &str) -> bool {
    body.to_lowercase().contains("rate limit")
}

/// Extracts `error.message` from a JSON error body, falling back to the raw text.
fn upstream_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    let text = from_json.unwrap_or_else(|| body.trim().to_string());
    if text.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }

    let shortened: String = text.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    if shortened.len() < text.len() {
        format!("HTTP {}: {}...", status.as_u16(), shortened)
    } else {
        format!("HTTP {}: {}", status.as_u16(), shortened)
    }
}
