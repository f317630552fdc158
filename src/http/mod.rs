//! HTTP client module with retry logic and error classification.

mod client;
mod retry;

pub use client::HttpClient;
pub use retry::{
    BackoffPolicy, CallState, Decision, MAX_RETRIES, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS,
    RetryState, Sleeper, TokioSleeper, classify_status, classify_transport_error, with_retry,
};
