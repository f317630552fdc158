use anyhow::Result;

use crate::perplexity::PerplexityApi;
use crate::schema::{ChatMessage, ChatQuery, ChatQueryInput, Model, SearchMode};
use crate::ui::{format_sources, format_usage};

#[derive(Debug, Clone)]
pub struct ChatArgs {
    pub message: String,
    pub model: Model,
    pub temperature: f64,
    pub search_mode: SearchMode,
}

/// Sends one user message and renders the reply, usage and sources.
#[tracing::instrument(skip(api, args))]
pub async fn chat<A: PerplexityApi + ?Sized>(api: &A, args: ChatArgs) -> Result<String> {
    if args.message.trim().is_empty() {
        anyhow::bail!("Enter a message");
    }

    let query = ChatQuery::try_from(ChatQueryInput {
        model: args.model,
        messages: vec![ChatMessage::user(args.message)],
        temperature: args.temperature,
        search_mode: args.search_mode,
        ..ChatQueryInput::default()
    })?;

    let response = api
        .chat(&query)
        .await
        .map_err(|e| anyhow::anyhow!("Chat failed: {}", e))?;

    let mut out = format!("{}\n\n{}", response.content, format_usage(&response.usage));
    let sources = format_sources(response.search_results.as_deref().unwrap_or_default());
    if !sources.is_empty() {
        out.push_str("\n\nSources:\n");
        out.push_str(&sources);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::perplexity::MockPerplexityApi;
    use crate::schema::{ChatChoice, ChatResponse, ChatUsage, Role, SearchResultItem};

    fn args(message: &str) -> ChatArgs {
        ChatArgs {
            message: message.to_string(),
            model: Model::SonarPro,
            temperature: 0.5,
            search_mode: SearchMode::Academic,
        }
    }

    fn response(search_results: Option<Vec<SearchResultItem>>) -> ChatResponse {
        ChatResponse {
            id: "1".to_string(),
            model: "sonar-pro".to_string(),
            created: 0,
            content: "Rust is a systems language.".to_string(),
            choices: vec![ChatChoice {
                message: ChatMessage::new(Role::Assistant, "Rust is a systems language."),
                finish_reason: "stop".to_string(),
            }],
            usage: ChatUsage {
                prompt_tokens: 3,
                completion_tokens: 7,
                total_tokens: 10,
            },
            search_results,
        }
    }

    #[tokio::test]
    async fn test_chat_renders_reply_usage_and_sources() {
        let mut api = MockPerplexityApi::new();
        api.expect_chat()
            .withf(|q| {
                q.model() == Model::SonarPro
                    && q.temperature() == 0.5
                    && q.search_mode() == SearchMode::Academic
                    && q.messages() == [ChatMessage::user("What is Rust?")]
            })
            .times(1)
            .returning(|_| {
                Ok(response(Some(vec![SearchResultItem::new(
                    "Rust",
                    "",
                    Some("https://rust-lang.org".to_string()),
                    None,
                )])))
            });

        let out = chat(&api, args("What is Rust?")).await.unwrap();

        assert_eq!(
            out,
            "Rust is a systems language.\n\nTokens: 10 (prompt: 3, completion: 7)\n\nSources:\n- [Rust](https://rust-lang.org)"
        );
    }

    #[tokio::test]
    async fn test_chat_without_sources() {
        let mut api = MockPerplexityApi::new();
        api.expect_chat().returning(|_| Ok(response(None)));

        let out = chat(&api, args("hi")).await.unwrap();
        assert!(!out.contains("Sources"));
    }

    #[tokio::test]
    async fn test_chat_empty_message() {
        let mut api = MockPerplexityApi::new();
        api.expect_chat().times(0);

        let err = chat(&api, args("   ")).await.unwrap_err();
        assert_eq!(err.to_string(), "Enter a message");
    }

    #[tokio::test]
    async fn test_chat_upstream_failure() {
        let mut api = MockPerplexityApi::new();
        api.expect_chat()
            .returning(|_| Err(ApiError::Unauthorized("HTTP 401".to_string())));

        let err = chat(&api, args("hi")).await.unwrap_err();
        assert!(err.to_string().starts_with("Chat failed: Unauthorized"));
    }
}
