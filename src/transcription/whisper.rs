//! OpenAI Whisper transcription (also works with compatible APIs).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{Transcriber, TranscriptionError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Uploads can be slow for long voice notes
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

pub struct WhisperTranscriber {
    client: reqwest::Client,
    config: WhisperConfig,
}

impl WhisperTranscriber {
    pub fn new(config: WhisperConfig) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;

        if config.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, voice messages cannot be transcribed");
        }

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/audio/transcriptions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, TranscriptionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(TranscriptionError::NotConfigured)?;

        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.ogg".to_string());

        let form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Transcription API error ({}): {}", status, body);
            return Err(TranscriptionError::Service(format!("{}: {}", status, body)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranscriptionError::Service(e.to_string()))?;

        body["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TranscriptionError::Service("response without text".to_string()))
    }
}
