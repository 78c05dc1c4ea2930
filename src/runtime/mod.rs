// Chat platform abstraction for Telegram vs local console environments
//
// The dispatcher only sees `ChatPlatform`; voice downloads go through the
// separate `VoiceSource` seam so the input normalizer does not depend on
// the rest of the platform.

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::{ChatId, Incoming, Reply, VoiceRef};

pub mod console;
pub mod telegram;

pub use console::ConsolePlatform;
pub use telegram::{TelegramConfig, TelegramPlatform};

/// Platform-specific errors
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Chat API error: {0}")]
    Api(String),

    #[error("Input closed")]
    Closed,

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request URLs carry the bot token, so they never reach error text.
impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Request(err.without_url().to_string())
    }
}

/// Source of voice message audio.
#[async_trait]
pub trait VoiceSource: Send + Sync {
    async fn download_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, PlatformError>;
}

/// Chat platform the bot is connected to.
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Arc<dyn ChatPlatform>`.
#[async_trait]
pub trait ChatPlatform: Send + Sync + 'static {
    /// Wait for the next batch of inbound events.
    ///
    /// # Returns
    /// - `Ok(events)`, possibly empty when a long poll timed out
    /// - `Err(PlatformError::Closed)` when no more input will arrive
    async fn next_events(&self) -> Result<Vec<(ChatId, Incoming)>, PlatformError>;

    /// Deliver a reply to a chat.
    async fn send(&self, chat: ChatId, reply: &Reply) -> Result<(), PlatformError>;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Graceful shutdown - flush output, acknowledge consumed updates, etc.
    async fn shutdown(&self) -> Result<(), PlatformError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory platform pieces for tests.

    use std::collections::{HashMap, VecDeque};

    use parking_lot::Mutex;

    use super::*;

    /// Voice source serving canned audio by file id.
    #[derive(Default)]
    pub struct FakeVoices {
        audio: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FakeVoices {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_audio(self, file_id: &str, bytes: &[u8]) -> Self {
            self.audio.lock().insert(file_id.to_string(), bytes.to_vec());
            self
        }
    }

    #[async_trait]
    impl VoiceSource for FakeVoices {
        async fn download_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, PlatformError> {
            self.audio
                .lock()
                .get(&voice.file_id)
                .cloned()
                .ok_or_else(|| PlatformError::Api(format!("file {} not found", voice.file_id)))
        }
    }

    /// Platform replaying scripted batches and recording every reply.
    #[derive(Default)]
    pub struct ScriptedPlatform {
        batches: Mutex<VecDeque<Vec<(ChatId, Incoming)>>>,
        pub sent: Mutex<Vec<(ChatId, Reply)>>,
    }

    impl ScriptedPlatform {
        pub fn new(batches: Vec<Vec<(ChatId, Incoming)>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub fn sent_to(&self, chat: ChatId) -> Vec<Reply> {
            self.sent
                .lock()
                .iter()
                .filter(|(c, _)| *c == chat)
                .map(|(_, r)| r.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChatPlatform for ScriptedPlatform {
        async fn next_events(&self) -> Result<Vec<(ChatId, Incoming)>, PlatformError> {
            let next = self.batches.lock().pop_front();
            next.ok_or(PlatformError::Closed)
        }

        async fn send(&self, chat: ChatId, reply: &Reply) -> Result<(), PlatformError> {
            self.sent.lock().push((chat, reply.clone()));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn shutdown(&self) -> Result<(), PlatformError> {
            Ok(())
        }
    }
}
