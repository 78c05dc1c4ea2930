//! Settings loading and environment variable interpolation.
//!
//! The `SettingsManager` handles:
//! - Loading settings from `~/.notebot/settings.toml` (or an explicit path)
//! - Resolving `$VAR` and `${VAR}` environment variable references
//! - First-run template generation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use super::schema::NotebotSettings;

/// Embedded template for first-run generation.
const TEMPLATE: &str = include_str!("template.toml");

/// Get the path to the global settings file.
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notebot")
        .join("settings.toml")
}

/// Manages settings loading and interpolation.
pub struct SettingsManager {
    /// Cached settings (with env vars resolved)
    settings: RwLock<NotebotSettings>,

    /// Path to the settings file
    path: PathBuf,
}

impl SettingsManager {
    /// Create a new SettingsManager, loading from disk if available.
    ///
    /// Uses `path` when given, otherwise `~/.notebot/settings.toml`.
    pub async fn new(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(settings_path);
        let settings = Self::load_from_path(&path).await?;

        Ok(Self {
            settings: RwLock::new(settings),
            path,
        })
    }

    /// Load settings from a specific path.
    async fn load_from_path(path: &Path) -> Result<NotebotSettings> {
        if !path.exists() {
            tracing::debug!("Settings file not found at {:?}, using defaults", path);
            return Ok(NotebotSettings::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read settings file")?;

        let mut settings: NotebotSettings =
            toml::from_str(&contents).context("Failed to deserialize settings")?;

        Self::resolve_env_vars(&mut settings);

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Resolve $ENV_VAR references in string fields.
    ///
    /// A reference to an unset variable leaves the field unset, so the value
    /// is reported as missing instead of being used literally.
    fn resolve_env_vars(settings: &mut NotebotSettings) {
        fn resolve_opt(value: &mut Option<String>) {
            let Some(v) = value.as_deref() else { return };
            if !is_env_ref(v) {
                return;
            }
            let resolved = resolve_env_ref(v);
            if resolved.is_none() {
                tracing::warn!("Settings reference {} is not set", v.trim());
            }
            *value = resolved;
        }

        // Secrets
        resolve_opt(&mut settings.telegram.token);
        resolve_opt(&mut settings.notion.token);
        resolve_opt(&mut settings.openai.api_key);
        resolve_opt(&mut settings.openai.base_url);

        // Databases
        let notion = &mut settings.notion;
        resolve_opt(&mut notion.idea.database_id);
        resolve_opt(&mut notion.idea.title_property);
        resolve_opt(&mut notion.task.database_id);
        resolve_opt(&mut notion.task.title_property);
        resolve_opt(&mut notion.link.database_id);
        resolve_opt(&mut notion.link.title_property);
        resolve_opt(&mut notion.link.url_property);
        resolve_opt(&mut notion.link.tags_property);

        for property in notion.task.properties.iter_mut() {
            resolve_opt(&mut property.field);
        }
    }

    /// Get the current settings (read-only).
    pub async fn get(&self) -> NotebotSettings {
        self.settings.read().await.clone()
    }

    /// Check if settings file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Get the settings file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Ensure settings file exists, creating from template if needed.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, TEMPLATE).await?;
        tracing::info!("Generated settings template at {:?}", self.path);
        Ok(true)
    }
}

fn is_env_ref(value: &str) -> bool {
    value.trim().starts_with('$')
}

/// Resolve a $ENV_VAR or ${ENV_VAR} reference.
///
/// Returns `Some(resolved)` if the value starts with `$` and the env var exists.
/// Returns `None` if no env var reference or env var not set.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();

    if let Some(rest) = trimmed.strip_prefix('$') {
        let var_name = rest
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(rest);

        return std::env::var(var_name).ok();
    }

    None
}

/// Get a setting value with environment variable fallback.
///
/// Priority order:
/// 1. Settings value (if set and non-empty)
/// 2. Environment variable (first match from list)
/// 3. Default value
pub fn get_with_env_fallback(
    setting: &Option<String>,
    env_vars: &[&str],
    default: Option<String>,
) -> Option<String> {
    if let Some(v) = setting {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }

    for env_var in env_vars {
        if let Ok(v) = std::env::var(env_var) {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }

    default
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_settings(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_env_ref_forms() {
        std::env::set_var("NOTEBOT_TEST_OPENAI_KEY", "sk-test");

        assert_eq!(
            resolve_env_ref("$NOTEBOT_TEST_OPENAI_KEY"),
            Some("sk-test".to_string())
        );
        assert_eq!(
            resolve_env_ref(" ${NOTEBOT_TEST_OPENAI_KEY} "),
            Some("sk-test".to_string())
        );
        assert_eq!(resolve_env_ref("sk-literal"), None);
        assert!(is_env_ref("$X") && !is_env_ref("plain"));

        std::env::remove_var("NOTEBOT_TEST_OPENAI_KEY");
    }

    #[test]
    fn test_database_id_prefers_settings_then_env() {
        std::env::set_var("NOTEBOT_TEST_DB_FALLBACK", "db-from-env");

        let configured = Some("db-from-settings".to_string());
        assert_eq!(
            get_with_env_fallback(&configured, &["NOTEBOT_TEST_DB_FALLBACK"], None),
            configured
        );
        assert_eq!(
            get_with_env_fallback(&None, &["NOTEBOT_TEST_DB_FALLBACK"], None),
            Some("db-from-env".to_string())
        );
        // An empty value in the file counts as unset
        assert_eq!(
            get_with_env_fallback(&Some(String::new()), &["NOTEBOT_TEST_DB_FALLBACK"], None),
            Some("db-from-env".to_string())
        );

        std::env::remove_var("NOTEBOT_TEST_DB_FALLBACK");
    }

    #[test]
    fn test_title_property_default() {
        assert_eq!(
            get_with_env_fallback(&None, &["NOTEBOT_TEST_UNSET_TITLE"], Some("Name".to_string())),
            Some("Name".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let manager = SettingsManager::new(Some(PathBuf::from("/nonexistent/settings.toml")))
            .await
            .unwrap();

        let settings = manager.get().await;
        assert_eq!(settings.version, 1);
        assert_eq!(settings.notion.idea.database_id, None);
        assert!(!manager.exists());
    }

    #[tokio::test]
    async fn test_database_and_token_references_are_interpolated() {
        std::env::set_var("NOTEBOT_TEST_IDEA_DB", "db-from-env");
        std::env::set_var("NOTEBOT_TEST_NOTION_TOKEN", "secret_abc");

        let dir = tempfile::TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            "[notion]\ntoken = \"${NOTEBOT_TEST_NOTION_TOKEN}\"\n\n\
             [notion.idea]\ndatabase_id = \"$NOTEBOT_TEST_IDEA_DB\"\ntitle_property = \"Title\"\n",
        );

        let settings = SettingsManager::new(Some(path)).await.unwrap().get().await;
        assert_eq!(settings.notion.token.as_deref(), Some("secret_abc"));
        assert_eq!(
            settings.notion.idea.database_id.as_deref(),
            Some("db-from-env")
        );
        assert_eq!(settings.notion.idea.title_property.as_deref(), Some("Title"));

        std::env::remove_var("NOTEBOT_TEST_IDEA_DB");
        std::env::remove_var("NOTEBOT_TEST_NOTION_TOKEN");
    }

    #[tokio::test]
    async fn test_unset_references_leave_fields_unset() {
        std::env::remove_var("NOTEBOT_TEST_UNSET_DB");
        std::env::remove_var("NOTEBOT_TEST_UNSET_TOKEN");

        let dir = tempfile::TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            "[telegram]\ntoken = \"$NOTEBOT_TEST_UNSET_TOKEN\"\n\n\
             [notion.idea]\ndatabase_id = \"$NOTEBOT_TEST_UNSET_DB\"\n",
        );

        let settings = SettingsManager::new(Some(path)).await.unwrap().get().await;
        assert_eq!(settings.telegram.token, None);
        assert_eq!(settings.notion.idea.database_id, None);
    }

    #[tokio::test]
    async fn test_ensure_settings_file_writes_template_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let manager = SettingsManager::new(Some(path.clone())).await.unwrap();
        assert!(manager.ensure_settings_file().await.unwrap());
        assert!(!manager.ensure_settings_file().await.unwrap());

        // The template must itself be a valid settings file
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: NotebotSettings = toml::from_str(&contents).unwrap();
        assert_eq!(parsed.version, 1);
    }
}
