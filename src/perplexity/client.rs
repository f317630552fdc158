use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::types::{CompletionResponse, SearchApiResponse};
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpClient, Sleeper};
use crate::schema::{ChatQuery, ChatResponse, SearchQuery, SearchResponse, SearchResultItem};

pub const CHAT_PATH: &str = "chat/completions";
pub const SEARCH_PATH: &str = "search";

/// One logical call per method; retries happen inside.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PerplexityApi: Send + Sync {
    async fn chat(&self, query: &ChatQuery) -> Result<ChatResponse, ApiError>;
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ApiError>;
}

#[derive(Clone)]
pub struct Perplexity {
    http: HttpClient,
}

impl Perplexity {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    #[tracing::instrument(skip(config))]
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = config.build_client()?;
        let http = HttpClient::new(client, &config.base_url).with_policy(config.backoff);
        Ok(Self::new(http))
    }

    /// Replaces how the client waits between attempts.
    pub fn with_sleeper(self, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(self.http.with_sleeper(sleeper))
    }
}

#[async_trait]
impl PerplexityApi for Perplexity {
    #[tracing::instrument(skip(self, query), fields(model = %query.model()))]
    async fn chat(&self, query: &ChatQuery) -> Result<ChatResponse, ApiError> {
        debug!(
            "Sending chat completion with {} message(s)...",
            query.messages().len()
        );
        let response: CompletionResponse = self.http.post_json(CHAT_PATH, query).await?;
        ChatResponse::try_from(response)
    }

    #[tracing::instrument(skip(self, query))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ApiError> {
        debug!("Searching for {:?}...", query.query());
        let response: SearchApiResponse = self.http.post_json(SEARCH_PATH, query).await?;
        let results = response
            .results
            .into_iter()
            .map(SearchResultItem::from)
            .collect();
        Ok(SearchResponse::new(query.query(), results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::{ChatMessage, Model, RecencyFilter, SearchQueryInput};
    use mockito::Matcher;
    use serde_json::json;

    const COMPLETION: &str = r#"{
        "id": "test-123",
        "model": "sonar",
        "created": 1234567890,
        "choices": [{"message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
    }"#;

    fn client(url: &str) -> Perplexity {
        let config = Config::new(Some("pplx-test".to_string()), Some(url.to_string())).unwrap();
        Perplexity::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_chat_posts_validated_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("Authorization", "Bearer pplx-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "sonar",
                "messages": [{"role": "user", "content": "Hello"}],
                "temperature": 0.2,
                "search_mode": "web"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(COMPLETION)
            .create_async()
            .await;

        let query = ChatQuery::new(Model::Sonar, vec![ChatMessage::user("Hello")]).unwrap();
        let response = client(&server.url()).chat(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Hi there");
        assert_eq!(response.usage.prompt_tokens, 10);
        assert_eq!(response.search_results, None);
    }

    #[tokio::test]
    async fn test_chat_no_choices() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"id": "x", "model": "sonar", "created": 1, "choices": []}"#)
            .create_async()
            .await;

        let query = ChatQuery::new(Model::Sonar, vec![ChatMessage::user("Hello")]).unwrap();
        let err = client(&server.url()).chat(&query).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UpstreamServerError);
    }

    #[tokio::test]
    async fn test_search_with_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(Matcher::Json(json!({
                "query": "python",
                "max_results": 5,
                "max_tokens_per_page": 2048,
                "search_recency_filter": "week",
                "search_domain_filter": ["github.com"]
            })))
            .with_status(200)
            .with_body(
                r#"{"results": [{
                    "title": "Python Tutorial",
                    "snippet": "Learn Python programming",
                    "url": "https://example.com",
                    "date": "2024-01-01"
                }]}"#,
            )
            .create_async()
            .await;

        let query = SearchQuery::try_from(SearchQueryInput {
            query: "python".to_string(),
            search_recency_filter: Some(RecencyFilter::Week),
            search_domain_filter: Some(vec!["github.com".to_string()]),
            ..Default::default()
        })
        .unwrap();
        let response = client(&server.url()).search(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.count(), 1);
        assert_eq!(response.query(), "python");
        let item = &response.results()[0];
        assert_eq!(item.title, "Python Tutorial");
        assert_eq!(item.snippet, "Learn Python programming");
        assert_eq!(item.url.as_deref(), Some("https://example.com"));
        assert_eq!(item.published_date.as_deref(), Some("2024-01-01"));
    }

    #[tokio::test]
    async fn test_search_truncates_long_snippets() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({"results": [{"title": "Long", "snippet": "x".repeat(1000)}]});
        let _m = server
            .mock("POST", "/search")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let query = SearchQuery::new("long").unwrap();
        let response = client(&server.url()).search(&query).await.unwrap();

        assert_eq!(response.results()[0].snippet.len(), 500);
    }

    #[tokio::test]
    async fn test_search_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let query = SearchQuery::new("test").unwrap();
        let err = client(&server.url()).search(&query).await.unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
