//! Input normalizer: turns a text or voice message into plain text.
//!
//! Voice messages are downloaded through the chat platform, written to a
//! temporary file and handed to a [`Transcriber`]. The temporary file is
//! deleted when it goes out of scope, whatever the outcome.

pub mod whisper;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::{Incoming, VoiceRef};
use crate::runtime::VoiceSource;

pub use whisper::{WhisperConfig, WhisperTranscriber};

/// Transcription failures.
///
/// Every message starts with `Ошибка:` and is shown to the user as is.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Ошибка: Ключ OpenAI API не настроен.")]
    NotConfigured,

    #[error("Ошибка: Не удалось получить голосовое сообщение.")]
    Download(String),

    #[error("Ошибка: Произошла внутренняя ошибка при обработке вашего сообщения.")]
    Io(#[from] std::io::Error),

    #[error("Ошибка: Не удалось связаться с сервисом транскрипции.")]
    Service(String),

    #[error("Ошибка: Не удалось расшифровать голосовое сообщение.")]
    Empty,
}

impl TranscriptionError {
    /// Underlying cause, for logs.
    pub fn detail(&self) -> String {
        match self {
            TranscriptionError::Download(detail) | TranscriptionError::Service(detail) => {
                detail.clone()
            }
            TranscriptionError::Io(e) => e.to_string(),
            TranscriptionError::NotConfigured => "OPENAI_API_KEY is not set".to_string(),
            TranscriptionError::Empty => "empty transcript".to_string(),
        }
    }
}

/// Speech-to-text backend.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, TranscriptionError>;
}

pub struct InputNormalizer {
    voices: Arc<dyn VoiceSource>,
    transcriber: Arc<dyn Transcriber>,
}

impl InputNormalizer {
    pub fn new(voices: Arc<dyn VoiceSource>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            voices,
            transcriber,
        }
    }

    /// Plain text of a message. Text is trimmed; commands carry no content.
    pub async fn normalize(&self, event: &Incoming) -> Result<String, TranscriptionError> {
        match event {
            Incoming::Text(text) => Ok(text.trim().to_string()),
            Incoming::Voice(voice) => self.transcribe_voice(voice).await,
            Incoming::Command(_) => Ok(String::new()),
        }
    }

    async fn transcribe_voice(&self, voice: &VoiceRef) -> Result<String, TranscriptionError> {
        let audio = self
            .voices
            .download_voice(voice)
            .await
            .map_err(|e| TranscriptionError::Download(e.to_string()))?;

        // The guard removes the file on every return path
        let file = tempfile::Builder::new()
            .prefix("notebot-voice-")
            .suffix(audio_suffix(voice.mime_type.as_deref()))
            .tempfile()?;
        tokio::fs::write(file.path(), &audio).await?;

        tracing::debug!(
            "Transcribing {} bytes of audio from {}",
            audio.len(),
            file.path().display()
        );

        let text = self.transcriber.transcribe(file.path()).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TranscriptionError::Empty);
        }
        Ok(text.to_string())
    }
}

/// File suffix for the audio container; the transcription API sniffs the
/// format from the file name.
fn audio_suffix(mime_type: Option<&str>) -> &'static str {
    match mime_type {
        Some("audio/mpeg") => ".mp3",
        Some("audio/mp4") | Some("audio/m4a") => ".m4a",
        Some("audio/wav") | Some("audio/x-wav") => ".wav",
        Some("audio/webm") => ".webm",
        _ => ".ogg",
    }
}
