//! Page download and readable-text extraction.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{ContentFetcher, EnrichmentError, PageContent};

/// Desktop browser user agent; some sites refuse unknown clients
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const UNTITLED: &str = "Без заголовка";

pub struct ReadabilityFetcher {
    client: reqwest::Client,
}

impl ReadabilityFetcher {
    pub fn new(timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for ReadabilityFetcher {
    async fn fetch(&self, url: &str) -> Result<PageContent, EnrichmentError> {
        let parsed = Url::parse(url).map_err(|e| EnrichmentError::Fetch(e.to_string()))?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;
        let html = response
            .text()
            .await
            .map_err(|e| EnrichmentError::Fetch(e.to_string()))?;

        tracing::debug!("Fetched {} bytes from {}", html.len(), url);

        // Extraction is CPU-bound HTML parsing
        tokio::task::spawn_blocking(move || extract(&html, &parsed))
            .await
            .map_err(|e| EnrichmentError::Extract(e.to_string()))?
    }
}

fn extract(html: &str, url: &Url) -> Result<PageContent, EnrichmentError> {
    let product = readability::extractor::extract(&mut html.as_bytes(), url)
        .map_err(|e| EnrichmentError::Extract(e.to_string()))?;

    let title = product.title.trim();
    Ok(PageContent {
        title: if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title.to_string()
        },
        text: normalize_whitespace(&product.text),
    })
}

/// Collapse runs of blank lines and trim every line.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
