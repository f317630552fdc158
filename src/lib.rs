//! Aurora: a thin HTTP pass-through to the Perplexity chat and search APIs.
//!
//! The interesting part lives in [`http`]: every upstream call runs through a
//! capped exponential [`http::BackoffPolicy`] that only retries rate limits and
//! transient network failures, and surfaces the last error kind unchanged.

pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod perplexity;
pub mod schema;
pub mod server;
pub mod ui;

pub use config::Config;
pub use error::{ApiError, ErrorKind};
pub use perplexity::{Perplexity, PerplexityApi};
