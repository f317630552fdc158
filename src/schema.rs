//! Request and response models for the chat and search endpoints.
//!
//! Incoming payloads deserialize into the `*Input` types, which carry the
//! documented defaults. A validated [`ChatQuery`] or [`SearchQuery`] can only
//! be obtained through `TryFrom`, and exposes its fields read-only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Longest search query accepted, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

/// Snippets longer than this are cut when shaping search results.
pub const MAX_SNIPPET_CHARS: usize = 500;

pub const MAX_DOMAIN_FILTERS: usize = 20;
pub const MAX_LANGUAGE_FILTERS: usize = 10;

/// Implements `Display` and `FromStr` using the same names as the wire format.
macro_rules! wire_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ApiError::invalid(format!(
                        "Unknown {}: '{}'. Expected one of: {}",
                        $label,
                        other,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    #[default]
    Sonar,
    SonarPro,
    SonarReasoningPro,
    SonarDeepResearch,
}

wire_enum!(Model, "model", {
    Sonar => "sonar",
    SonarPro => "sonar-pro",
    SonarReasoningPro => "sonar-reasoning-pro",
    SonarDeepResearch => "sonar-deep-research",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

wire_enum!(Role, "role", {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Web,
    Academic,
    Sec,
}

wire_enum!(SearchMode, "search mode", {
    Web => "web",
    Academic => "academic",
    Sec => "sec",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyFilter {
    Day,
    Week,
    Month,
    Year,
}

wire_enum!(RecencyFilter, "recency filter", {
    Day => "day",
    Week => "week",
    Month => "month",
    Year => "year",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

wire_enum!(ReasoningEffort, "reasoning effort", {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Raw chat payload as received from a caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatQueryInput {
    pub model: Model,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stream: bool,
    pub search_mode: SearchMode,
    pub disable_search: bool,
    pub search_recency_filter: Option<RecencyFilter>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl Default for ChatQueryInput {
    fn default() -> Self {
        Self {
            model: Model::default(),
            messages: Vec::new(),
            max_tokens: None,
            temperature: 0.2,
            top_p: 0.9,
            top_k: 0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
            search_mode: SearchMode::default(),
            disable_search: false,
            search_recency_filter: None,
            reasoning_effort: None,
        }
    }
}

/// A validated chat completion request. Serializes to the upstream body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatQuery {
    model: Model,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f64,
    top_p: f64,
    top_k: u32,
    frequency_penalty: f64,
    presence_penalty: f64,
    search_mode: SearchMode,
    disable_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_recency_filter: Option<RecencyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<ReasoningEffort>,
}

impl ChatQuery {
    /// Validates a request using the defaults for every optional parameter.
    pub fn new(model: Model, messages: Vec<ChatMessage>) -> Result<Self, ApiError> {
        Self::try_from(ChatQueryInput {
            model,
            messages,
            ..ChatQueryInput::default()
        })
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn frequency_penalty(&self) -> f64 {
        self.frequency_penalty
    }

    pub fn presence_penalty(&self) -> f64 {
        self.presence_penalty
    }

    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    pub fn disable_search(&self) -> bool {
        self.disable_search
    }

    pub fn search_recency_filter(&self) -> Option<RecencyFilter> {
        self.search_recency_filter
    }

    pub fn reasoning_effort(&self) -> Option<ReasoningEffort> {
        self.reasoning_effort
    }
}

impl TryFrom<ChatQueryInput> for ChatQuery {
    type Error = ApiError;

    fn try_from(input: ChatQueryInput) -> Result<Self, Self::Error> {
        if input.stream {
            return Err(ApiError::invalid("streaming responses are not supported"));
        }
        if input.messages.is_empty() {
            return Err(ApiError::invalid("messages must contain at least one message"));
        }
        if input.max_tokens == Some(0) {
            return Err(ApiError::invalid("max_tokens must be at least 1"));
        }
        check_range("temperature", input.temperature, 0.0, 2.0)?;
        check_range("top_p", input.top_p, 0.0, 1.0)?;
        check_range("frequency_penalty", input.frequency_penalty, -2.0, 2.0)?;
        check_range("presence_penalty", input.presence_penalty, -2.0, 2.0)?;

        let messages = input
            .messages
            .into_iter()
            .map(|m| ChatMessage::new(m.role, m.content.trim()))
            .collect();

        Ok(Self {
            model: input.model,
            messages,
            max_tokens: input.max_tokens,
            temperature: input.temperature,
            top_p: input.top_p,
            top_k: input.top_k,
            frequency_penalty: input.frequency_penalty,
            presence_penalty: input.presence_penalty,
            search_mode: input.search_mode,
            disable_search: input.disable_search,
            search_recency_filter: input.search_recency_filter,
            reasoning_effort: input.reasoning_effort,
        })
    }
}

/// Raw search payload as received from a caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchQueryInput {
    pub query: String,
    pub max_results: u32,
    pub max_tokens_per_page: u32,
    pub search_recency_filter: Option<RecencyFilter>,
    pub search_domain_filter: Option<Vec<String>>,
    pub search_language_filter: Option<Vec<String>>,
    pub country: Option<String>,
}

impl Default for SearchQueryInput {
    fn default() -> Self {
        Self {
            query: String::new(),
            max_results: 5,
            max_tokens_per_page: 2048,
            search_recency_filter: None,
            search_domain_filter: None,
            search_language_filter: None,
            country: None,
        }
    }
}

/// A validated search request. Serializes to the upstream body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    query: String,
    max_results: u32,
    max_tokens_per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_recency_filter: Option<RecencyFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    search_domain_filter: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    search_language_filter: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
}

impl SearchQuery {
    /// Validates a query using the default result count and page size.
    pub fn new(query: impl Into<String>) -> Result<Self, ApiError> {
        Self::try_from(SearchQueryInput {
            query: query.into(),
            ..SearchQueryInput::default()
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    pub fn max_tokens_per_page(&self) -> u32 {
        self.max_tokens_per_page
    }

    pub fn search_recency_filter(&self) -> Option<RecencyFilter> {
        self.search_recency_filter
    }

    pub fn search_domain_filter(&self) -> &[String] {
        &self.search_domain_filter
    }

    pub fn search_language_filter(&self) -> &[String] {
        &self.search_language_filter
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

impl TryFrom<SearchQueryInput> for SearchQuery {
    type Error = ApiError;

    fn try_from(input: SearchQueryInput) -> Result<Self, Self::Error> {
        let query = input.query.trim().to_string();
        if query.is_empty() {
            return Err(ApiError::invalid("query must not be empty"));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(ApiError::invalid(format!(
                "query must be at most {} characters",
                MAX_QUERY_CHARS
            )));
        }
        if !(1..=50).contains(&input.max_results) {
            return Err(ApiError::invalid("max_results must be between 1 and 50"));
        }
        if !(256..=4096).contains(&input.max_tokens_per_page) {
            return Err(ApiError::invalid(
                "max_tokens_per_page must be between 256 and 4096",
            ));
        }

        let search_domain_filter = clean_list(
            "search_domain_filter",
            input.search_domain_filter,
            MAX_DOMAIN_FILTERS,
        )?;
        let search_language_filter = clean_list(
            "search_language_filter",
            input.search_language_filter,
            MAX_LANGUAGE_FILTERS,
        )?;

        let country = match input.country.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(code.to_ascii_uppercase())
            }
            Some(code) => {
                return Err(ApiError::invalid(format!(
                    "country must be a two-letter ISO 3166-1 code, got '{}'",
                    code
                )));
            }
        };

        Ok(Self {
            query,
            max_results: input.max_results,
            max_tokens_per_page: input.max_tokens_per_page,
            search_recency_filter: input.search_recency_filter,
            search_domain_filter,
            search_language_filter,
            country,
        })
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::invalid(format!(
            "{} must be between {} and {}",
            field, min, max
        )))
    }
}

fn clean_list(
    field: &str,
    values: Option<Vec<String>>,
    max_len: usize,
) -> Result<Vec<String>, ApiError> {
    let values: Vec<String> = values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .collect();

    if values.len() > max_len {
        return Err(ApiError::invalid(format!(
            "{} accepts at most {} entries",
            field, max_len
        )));
    }
    if values.iter().any(String::is_empty) {
        return Err(ApiError::invalid(format!(
            "{} must not contain empty entries",
            field
        )));
    }
    Ok(values)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub snippet: String,
    pub url: Option<String>,
    pub published_date: Option<String>,
}

impl SearchResultItem {
    /// Builds an item, cutting the snippet to [`MAX_SNIPPET_CHARS`].
    pub fn new(
        title: impl Into<String>,
        snippet: &str,
        url: Option<String>,
        published_date: Option<String>,
    ) -> Self {
        Self {
            title: title.into().trim().to_string(),
            snippet: snippet.trim().chars().take(MAX_SNIPPET_CHARS).collect(),
            url,
            published_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub created: i64,
    /// Content of the first choice.
    pub content: String,
    pub choices: Vec<ChatChoice>,
    pub usage: ChatUsage,
    pub search_results: Option<Vec<SearchResultItem>>,
}

/// Search results for one query. `count` always equals the number of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    results: Vec<SearchResultItem>,
    query: String,
    count: usize,
}

impl SearchResponse {
    pub fn new(query: impl Into<String>, results: Vec<SearchResultItem>) -> Self {
        Self {
            count: results.len(),
            results,
            query: query.into(),
        }
    }

    pub fn results(&self) -> &[SearchResultItem] {
        &self.results
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
