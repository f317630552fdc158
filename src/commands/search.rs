use anyhow::Result;

use crate::perplexity::PerplexityApi;
use crate::schema::{RecencyFilter, SearchQuery, SearchQueryInput};
use crate::ui::format_search_results;

#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub query: String,
    pub max_results: u32,
    pub recency: Option<RecencyFilter>,
}

/// Runs one search and renders the numbered results.
#[tracing::instrument(skip(api, args))]
pub async fn search<A: PerplexityApi + ?Sized>(api: &A, args: SearchArgs) -> Result<String> {
    if args.query.trim().is_empty() {
        anyhow::bail!("Enter a search query");
    }

    let query = SearchQuery::try_from(SearchQueryInput {
        query: args.query,
        max_results: args.max_results,
        search_recency_filter: args.recency,
        ..SearchQueryInput::default()
    })?;

    let response = api
        .search(&query)
        .await
        .map_err(|e| anyhow::anyhow!("Search failed: {}", e))?;

    Ok(format_search_results(response.results()))
}
