//! The web UI page and the plain-text renderings shared with the CLI.

use crate::schema::{ChatUsage, SearchResultItem};

/// Single-page UI with Chat and Search tabs, served at `/`.
pub const INDEX_HTML: &str = include_str!("../assets/index.html");

pub fn format_usage(usage: &ChatUsage) -> String {
    format!(
        "Tokens: {} (prompt: {}, completion: {})",
        usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
    )
}

/// Markdown links for every result that has a URL, one per line.
pub fn format_sources(results: &[SearchResultItem]) -> String {
    results
        .iter()
        .filter_map(|r| r.url.as_ref().map(|url| format!("- [{}]({})", r.title, url)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_search_results(results: &[SearchResultItem]) -> String {
    if results.is_empty() {
        return "No results found".to_string();
    }

    let mut lines = Vec::new();
    for (i, result) in results.iter().enumerate() {
        lines.push(format!("**{}. {}**", i + 1, result.title));
        lines.push(result.snippet.clone());
        if let Some(url) = &result.url {
            lines.push(format!("[{}]({})", url, url));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
