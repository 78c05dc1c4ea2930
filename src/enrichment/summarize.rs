//! Link summaries via an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;

use super::{EnrichmentError, Summarizer, Summary};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 60;

const SYSTEM_PROMPT: &str = "You are an expert content analyst. Your task is to process the \
     text from a web page and provide a concise title, a short summary, and relevant tags.";

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// Page text beyond this many characters is not sent
    pub max_chars: usize,
}

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    config: SummarizerConfig,
}

impl OpenAiSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EnrichmentError::Summarize(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str, title_hint: &str) -> Result<Summary, EnrichmentError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| EnrichmentError::NotConfigured("OPENAI_API_KEY".to_string()))?;
        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(text, title_hint, self.config.max_chars) }
            ],
            "temperature": self.config.temperature
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| EnrichmentError::Summarize(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Summarize(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Summarize(e.to_string()))?;
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EnrichmentError::Parse("invalid response format".to_string()))?;

        parse_summary(content)
    }
}

/// Keep at most `max_chars` characters, cutting on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_prompt(text: &str, title_hint: &str, max_chars: usize) -> String {
    format!(
        r#"Here is the text from a web page. The original title was "{title}".

Text:
---
{text}
---

Please analyze the text and provide the following in the specified format:
1.  A new, concise, and engaging title for this content.
2.  A summary of the content in 2-4 sentences.
3.  A list of 3-5 relevant keywords or tags, separated by commas.

Please format your response exactly as follows:
Title: [Your generated title here]
Summary: [Your generated summary here]
Tags: [tag1, tag2, tag3]"#,
        title = title_hint,
        text = truncate_chars(text, max_chars)
    )
}

/// Parse the `Title:` / `Summary:` / `Tags:` lines of a model answer.
///
/// Title and summary are required; tags default to none.
pub fn parse_summary(content: &str) -> Result<Summary, EnrichmentError> {
    let mut title = None;
    let mut summary = None;
    let mut tags = Vec::new();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Title:") {
            title = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Summary:") {
            summary = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Tags:") {
            tags = rest
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    match (title, summary) {
        (Some(title), Some(summary)) => Ok(Summary {
            title,
            summary,
            tags,
        }),
        _ => Err(EnrichmentError::Parse(
            "missing Title or Summary line".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_answer() {
        let summary = parse_summary(
            "Title: Async Rust in depth\nSummary: A tour of futures.\nTags: rust, async, tokio",
        )
        .unwrap();

        assert_eq!(summary.title, "Async Rust in depth");
        assert_eq!(summary.summary, "A tour of futures.");
        assert_eq!(summary.tags, vec!["rust", "async", "tokio"]);
    }

    #[test]
    fn tags_are_optional_and_brackets_stripped() {
        let summary = parse_summary("Title: T\nSummary: S").unwrap();
        assert!(summary.tags.is_empty());

        let summary = parse_summary("Title: T\nSummary: S\nTags: [a, , b]").unwrap();
        assert_eq!(summary.tags, vec!["a", "b"]);
    }

    #[test]
    fn missing_summary_is_an_error() {
        assert!(matches!(
            parse_summary("Title: only a title"),
            Err(EnrichmentError::Parse(_))
        ));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn prompt_contains_hint_and_truncated_text() {
        let prompt = build_prompt(&"x".repeat(50), "Original", 10);
        assert!(prompt.contains("\"Original\""));
        assert!(prompt.contains(&format!("---\n{}\n---", "x".repeat(10))));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let summarizer = OpenAiSummarizer::new(SummarizerConfig {
            api_key: None,
            base_url: None,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
            max_chars: 15_000,
        })
        .unwrap();

        let err = summarizer.summarize("text", "title").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::NotConfigured(_)));
    }
}
