mod client;
mod types;

pub use client::{CHAT_PATH, Perplexity, PerplexityApi, SEARCH_PATH};
#[cfg(test)]
pub use client::MockPerplexityApi;
pub use types::{CompletionResponse, SearchApiResponse, SearchHit};
