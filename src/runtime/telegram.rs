//! Telegram Bot API over long polling.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatPlatform, PlatformError, VoiceSource};
use crate::conversation::{ChatId, Incoming, Keyboard, Reply, VoiceRef};

/// Slack added on top of the long-poll timeout for the HTTP request itself
const POLL_GRACE_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub api_base: String,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
    voice: Option<Voice>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: ChatId,
}

#[derive(Debug, Deserialize)]
struct Voice {
    file_id: String,
    mime_type: Option<String>,
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct File {
    file_path: Option<String>,
}

pub struct TelegramPlatform {
    client: reqwest::Client,
    config: TelegramConfig,
    /// Next update id to request; everything below is acknowledged
    offset: Mutex<i64>,
}

impl TelegramPlatform {
    pub fn new(config: TelegramConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + POLL_GRACE_SECS))
            .build()?;
        Ok(Self {
            client,
            config,
            offset: Mutex::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.token,
            file_path
        )
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, PlatformError> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(PlatformError::Api(format!(
                "{}: {}",
                method,
                response.description.unwrap_or_default()
            )));
        }
        response
            .result
            .ok_or_else(|| PlatformError::Api(format!("{}: empty result", method)))
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn next_events(&self) -> Result<Vec<(ChatId, Incoming)>, PlatformError> {
        let offset = *self.offset.lock();
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &json!({
                    "offset": offset,
                    "timeout": self.config.poll_timeout_secs,
                    "allowed_updates": ["message"]
                }),
            )
            .await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            *self.offset.lock() = last + 1;
        }

        Ok(updates.into_iter().filter_map(into_event).collect())
    }

    async fn send(&self, chat: ChatId, reply: &Reply) -> Result<(), PlatformError> {
        let mut body = json!({ "chat_id": chat, "text": reply.text });
        if let Some(markup) = reply_markup(&reply.keyboard) {
            body["reply_markup"] = markup;
        }
        let _: Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn shutdown(&self) -> Result<(), PlatformError> {
        // Acknowledge consumed updates so they are not redelivered on restart
        let offset = *self.offset.lock();
        if offset > 0 {
            let _: Vec<Value> = self
                .call("getUpdates", &json!({ "offset": offset, "timeout": 0 }))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VoiceSource for TelegramPlatform {
    async fn download_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, PlatformError> {
        let file: File = self
            .call("getFile", &json!({ "file_id": voice.file_id }))
            .await?;
        let file_path = file
            .file_path
            .ok_or_else(|| PlatformError::Api("getFile: no file_path".to_string()))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Message updates with text or voice become events; everything else is ignored.
fn into_event(update: Update) -> Option<(ChatId, Incoming)> {
    let message = update.message?;
    let chat = message.chat.id;
    if let Some(voice) = message.voice {
        return Some((
            chat,
            Incoming::Voice(VoiceRef {
                file_id: voice.file_id,
                mime_type: voice.mime_type,
                duration_secs: voice.duration,
            }),
        ));
    }
    message.text.map(|text| (chat, Incoming::from_text(text)))
}

fn reply_markup(keyboard: &Keyboard) -> Option<Value> {
    match keyboard {
        Keyboard::Unchanged => None,
        Keyboard::Remove => Some(json!({ "remove_keyboard": true })),
        Keyboard::Choices(rows) => Some(json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "one_time_keyboard": true,
            "resize_keyboard": true
        })),
    }
}
