//! Link enrichment: fetch a page, extract its text and summarize it.
//!
//! [`LinkEnricher::process`] always yields a [`LinkSummary`]; fetch or
//! summarize failures degrade to placeholder texts.

pub mod fetch;
pub mod summarize;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use fetch::ReadabilityFetcher;
pub use summarize::{OpenAiSummarizer, SummarizerConfig};

const TEXT_NOT_EXTRACTED: &str = "Не удалось извлечь основной текст.";
const ANALYSIS_FAILED: &str = "Анализ не удался.";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Failed to extract page content: {0}")]
    Extract(String),

    #[error("Summarizer not configured: {0} is missing")]
    NotConfigured(String),

    #[error("Summarizer request failed: {0}")]
    Summarize(String),

    #[error("Could not parse summary: {0}")]
    Parse(String),
}

/// Readable content of a web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub text: String,
}

/// Generated title, short summary and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Everything stored for a link record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub url: String,
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageContent, EnrichmentError>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, title_hint: &str) -> Result<Summary, EnrichmentError>;
}

pub struct LinkEnricher {
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: Arc<dyn Summarizer>,
}

impl LinkEnricher {
    pub fn new(fetcher: Arc<dyn ContentFetcher>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }

    pub async fn process(&self, url: &str) -> LinkSummary {
        tracing::info!("Processing link {}", url);

        let page = match self.fetcher.fetch(url).await {
            Ok(page) if !page.text.trim().is_empty() => page,
            Ok(page) => {
                tracing::warn!("No readable text extracted from {}", url);
                return placeholder(non_empty_or(page.title, url), TEXT_NOT_EXTRACTED, url);
            }
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}", url, e);
                return placeholder(url.to_string(), TEXT_NOT_EXTRACTED, url);
            }
        };

        match self.summarizer.summarize(&page.text, &page.title).await {
            Ok(summary) => {
                tracing::info!("Link processed: {}", summary.title);
                LinkSummary {
                    title: summary.title,
                    summary: summary.summary,
                    tags: summary.tags,
                    url: url.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!("Summary of {} failed, keeping page title: {}", url, e);
                placeholder(non_empty_or(page.title, url), ANALYSIS_FAILED, url)
            }
        }
    }
}

fn non_empty_or(title: String, fallback: &str) -> String {
    if title.trim().is_empty() {
        fallback.to_string()
    } else {
        title
    }
}

fn placeholder(title: String, summary: &str, url: &str) -> LinkSummary {
    LinkSummary {
        title,
        summary: summary.to_string(),
        tags: Vec::new(),
        url: url.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::fake::*;
    use super::*;

    const URL: &str = "https://example.com/post";

    #[tokio::test]
    async fn successful_enrichment_uses_summary() {
        let enricher = enricher(
            Ok(page("Original", "Body text")),
            Ok(summary("Better title", "Short summary.", &["rust", "async"])),
        );

        let link = enricher.process(URL).await;
        assert_eq!(link.title, "Better title");
        assert_eq!(link.summary, "Short summary.");
        assert_eq!(link.tags, vec!["rust", "async"]);
        assert_eq!(link.url, URL);
    }

    #[tokio::test]
    async fn fetch_failure_falls_back_to_url() {
        let enricher = enricher(Err("timeout".to_string()), Ok(summary("x", "y", &[])));

        let link = enricher.process(URL).await;
        assert_eq!(link.title, URL);
        assert_eq!(link.summary, TEXT_NOT_EXTRACTED);
        assert!(link.tags.is_empty());
    }

    #[tokio::test]
    async fn empty_text_keeps_page_title() {
        let enricher = enricher(Ok(page("Landing", "  ")), Ok(summary("x", "y", &[])));

        let link = enricher.process(URL).await;
        assert_eq!(link.title, "Landing");
        assert_eq!(link.summary, TEXT_NOT_EXTRACTED);
    }

    #[tokio::test]
    async fn summarize_failure_keeps_page_title() {
        let enricher = enricher(Ok(page("Original", "Body")), Err("quota".to_string()));

        let link = enricher.process(URL).await;
        assert_eq!(link.title, "Original");
        assert_eq!(link.summary, ANALYSIS_FAILED);
        assert!(link.tags.is_empty());
        assert_eq!(link.url, URL);
    }
}
