use thiserror::Error;

use crate::notion::StoreError;

/// Errors raised while driving a capture conversation.
///
/// Every variant is converted into a user-facing message by the state
/// machine; none of them is allowed to escape an event worker.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A required identifier or name is absent from the configuration.
    #[error("Configuration missing: {key} ({what})")]
    ConfigurationMissing { key: String, what: String },

    /// A record store, transcription or enrichment call failed.
    #[error("External call failed: {0}")]
    ExternalCallFailed(String),

    /// The user sent something the current state cannot accept.
    #[error("Invalid input: {0}")]
    InvalidUserInput(String),
}

impl CaptureError {
    pub fn missing(key: impl Into<String>, what: impl Into<String>) -> Self {
        CaptureError::ConfigurationMissing {
            key: key.into(),
            what: what.into(),
        }
    }

    /// Message shown to the user in the chat.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::ConfigurationMissing { key, what } if key.starts_with("NOTION_DATABASE_ID") => {
                format!(
                    "ID базы данных для '{}' не найден. Проверьте .env файл ({}).",
                    what, key
                )
            }
            CaptureError::ConfigurationMissing { key, what } => format!(
                "{} не настроен. Проверьте .env файл ({}).",
                what, key
            ),
            CaptureError::ExternalCallFailed(_) => {
                "Не удалось связаться с Notion. Проверьте логи для деталей.".to_string()
            }
            CaptureError::InvalidUserInput(hint) => hint.clone(),
        }
    }

    /// Whether the session survives this error (re-prompt in place).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CaptureError::InvalidUserInput(_))
    }
}

impl From<StoreError> for CaptureError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotConfigured(key) => CaptureError::missing(key, "Notion"),
            other => CaptureError::ExternalCallFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;
