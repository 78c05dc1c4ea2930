//! Centralized TOML-based settings system for notebot.
//!
//! Settings are loaded from `~/.notebot/settings.toml` with environment variable
//! interpolation support. Every recognised key also falls back to the plain
//! environment variable of the same meaning through `get_with_env_fallback`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::settings::{SettingsManager, get_with_env_fallback};
//!
//! let manager = SettingsManager::new(None).await?;
//! let settings = manager.get().await;
//!
//! let token = get_with_env_fallback(&settings.notion.token, &["NOTION_TOKEN"], None);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, SettingsManager};
pub use schema::NotebotSettings;
