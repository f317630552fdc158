use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::time::Duration;

use crate::http::BackoffPolicy;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";

/// Per-attempt network timeout. Deep research completions can take minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Process-wide settings, resolved once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &mask_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Config {
    /// Fails when no API key is available; this is a startup error, not a retry condition.
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = match api_key.map(|k| k.trim().to_string()) {
            Some(key) if !key.is_empty() => key,
            _ => bail!(
                "{} is not set. Export your Perplexity API key or pass --api-key.",
                API_KEY_ENV
            ),
        };

        let base_url = base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            backoff: BackoffPolicy::default(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Builds the reqwest client carrying bearer auth and the per-attempt timeout.
    pub fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .context("API key contains characters not allowed in an HTTP header")?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        debug!(
            "Using {} for authentication: {}",
            API_KEY_ENV,
            mask_key(&self.api_key)
        );

        let client = Client::builder()
            .user_agent(concat!("aurora/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(client)
    }
}

/// Shows at most the first and last four characters of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_config_requires_api_key() {
        let err = Config::new(None, None).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));

        let err = Config::new(Some("   ".to_string()), None).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new(Some("pplx-test".to_string()), None).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.backoff, BackoffPolicy::default());
    }

    #[test]
    fn test_config_base_url_override() {
        let config = Config::new(
            Some("pplx-test".to_string()),
            Some("http://localhost:9000/".to_string()),
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config::new(Some("pplx-1234567890abcdef".to_string()), None).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("1234567890"));
        assert!(debug.contains("pplx*********cdef"));

        assert_eq!(mask_key("short"), "*********");
    }

    #[tokio::test]
    async fn test_build_client_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("Authorization", "Bearer pplx-test")
            .match_header(
                "User-Agent",
                mockito::Matcher::Regex("^aurora/".to_string()),
            )
            .create_async()
            .await;

        let config = Config::new(Some("pplx-test".to_string()), None).unwrap();
        let client = config.build_client().unwrap();
        let _ = client.get(server.url()).send().await;

        mock.assert_async().await;
    }

    #[test]
    fn test_build_client_rejects_invalid_header_value() {
        let config = Config::new(Some("bad\nkey".to_string()), None).unwrap();
        assert!(config.build_client().is_err());
    }
}
