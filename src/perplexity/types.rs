//! Wire types returned by the Perplexity API.

use serde::Deserialize;

use crate::error::ApiError;
use crate::schema::{ChatChoice, ChatMessage, ChatResponse, ChatUsage, Role, SearchResultItem};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: ChatUsage,
    #[serde(default)]
    pub search_results: Option<Vec<SearchHit>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A search hit, shared by chat citations and the search endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "date")]
    pub published_date: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SearchApiResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl From<SearchHit> for SearchResultItem {
    fn from(hit: SearchHit) -> Self {
        SearchResultItem::new(
            hit.title.unwrap_or_default(),
            hit.snippet.as_deref().unwrap_or_default(),
            hit.url,
            hit.published_date,
        )
    }
}

impl TryFrom<CompletionResponse> for ChatResponse {
    type Error = ApiError;

    fn try_from(response: CompletionResponse) -> Result<Self, Self::Error> {
        if response.choices.is_empty() {
            return Err(ApiError::UpstreamServerError(
                "Response has no choices".to_string(),
            ));
        }

        let choices: Vec<ChatChoice> = response
            .choices
            .into_iter()
            .map(|choice| ChatChoice {
                message: ChatMessage::new(
                    Role::Assistant,
                    choice.message.content.unwrap_or_default(),
                ),
                finish_reason: choice.finish_reason.unwrap_or_default(),
            })
            .collect();

        let search_results = response
            .search_results
            .filter(|hits| !hits.is_empty())
            .map(|hits| hits.into_iter().map(SearchResultItem::from).collect());

        Ok(ChatResponse {
            id: response.id,
            model: response.model,
            created: response.created,
            content: choices[0].message.content.clone(),
            choices,
            usage: response.usage,
            search_results,
        })
    }
}
