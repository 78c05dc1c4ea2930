//! Settings schema definitions for notebot configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults; secrets and database ids stay
//! `None` so that the environment fallback in `crate::config` can fill them.

use serde::{Deserialize, Serialize};

/// Root settings structure for notebot.
///
/// Loaded from `~/.notebot/settings.toml` with environment variable interpolation support.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebotSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Telegram Bot API connection
    pub telegram: TelegramSettings,

    /// Notion record store
    pub notion: NotionSettings,

    /// OpenAI-compatible transcription and summarization
    pub openai: OpenAiSettings,

    /// Conversation behaviour
    pub capture: CaptureSettings,
}

/// Telegram Bot API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Bot API base URL
    pub api_base: String,

    /// Long-polling timeout for getUpdates, in seconds
    pub poll_timeout_secs: u64,
}

/// Notion API settings and per-category databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    /// Integration token (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Value of the `Notion-Version` header
    pub api_version: String,

    /// Database for ideas
    pub idea: DatabaseSettings,

    /// Database for tasks, with the ordered property questions
    pub task: TaskDatabaseSettings,

    /// Database for links
    pub link: LinkDatabaseSettings,
}

/// A database and the name of its title property.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_property: Option<String>,
}

/// Task database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDatabaseSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_property: Option<String>,

    /// Properties asked after the task title, in this order
    pub properties: Vec<TaskPropertySettings>,
}

/// One property question of the task flow.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TaskPropertySettings {
    /// Label shown to the user ("Выберите {label}:")
    pub label: String,

    /// Notion property name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Environment variable consulted when `field` is not set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

/// Link database settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LinkDatabaseSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_property: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_property: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_property: Option<String>,
}

/// OpenAI API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// OpenAI API key (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom base URL for OpenAI-compatible APIs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Speech-to-text model
    pub transcription_model: String,

    /// Chat model used to summarize links
    pub summary_model: String,

    /// Sampling temperature for summaries
    pub temperature: f32,
}

/// Conversation behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Abandoned sessions are dropped after this many seconds
    pub session_ttl_secs: u64,

    /// Per-chat workers exit after this many idle seconds
    pub worker_idle_secs: u64,

    /// Page text sent to the summarizer is cut to this many characters
    pub max_summary_chars: usize,

    /// Timeout for fetching a linked page, in seconds
    pub fetch_timeout_secs: u64,
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for NotebotSettings {
    fn default() -> Self {
        Self {
            version: 1,
            telegram: TelegramSettings::default(),
            notion: NotionSettings::default(),
            openai: OpenAiSettings::default(),
            capture: CaptureSettings::default(),
        }
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            idea: DatabaseSettings::default(),
            task: TaskDatabaseSettings::default(),
            link: LinkDatabaseSettings::default(),
        }
    }
}

impl Default for TaskDatabaseSettings {
    fn default() -> Self {
        let slot = |label: &str, env: &str| TaskPropertySettings {
            label: label.to_string(),
            field: None,
            env: Some(env.to_string()),
        };

        Self {
            database_id: None,
            title_property: None,
            properties: vec![
                slot("ТИП", "NOTION_TASK_TYPE_PROP"),
                slot("ВАЖНОСТЬ", "NOTION_TASK_IMPORTANCE_PROP"),
                slot("СКОРОСТЬ", "NOTION_TASK_SPEED_PROP"),
                slot("ИНТЕРЕС", "NOTION_TASK_INTEREST_PROP"),
            ],
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            transcription_model: "whisper-1".to_string(),
            summary_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.5,
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            session_ttl_secs: 30 * 60,
            worker_idle_secs: 5 * 60,
            max_summary_chars: 15_000,
            fetch_timeout_secs: 10,
        }
    }
}
