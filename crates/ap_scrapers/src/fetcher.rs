use std::time::Duration;

use ap_core::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download the HTML of a page
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

/// Only absolute http(s) URLs are fetched
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| Error::Scraping(format!("Failed to parse URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::Scraping(format!("Unsupported URL scheme: {}", scheme))),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let url = parse_url(url)?;
        tracing::debug!(%url, "fetching page");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!(
                "Failed to fetch URL: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
        }

        let html = response.text().await?;
        tracing::debug!(%url, bytes = html.len(), "page fetched");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://example.com/a?b=c").is_ok());
        assert!(parse_url("  http://example.com ").is_ok());
        assert!(parse_url("ftp://example.com").is_err());
        assert!(parse_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_scheme() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch_html("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("Unsupported URL scheme"));
    }
}
