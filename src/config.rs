//! Resolved capture configuration.
//!
//! Built once at startup from [`NotebotSettings`] with environment variable
//! fallback. Database ids stay optional here: a missing id is reported to
//! the user when a session needs it, it never stops the process.

use crate::conversation::{Category, PropertySlot};
use crate::error::CaptureError;
use crate::settings::schema::TaskPropertySettings;
use crate::settings::{get_with_env_fallback, NotebotSettings};

const DEFAULT_TITLE_PROPERTY: &str = "Name";
const DEFAULT_URL_PROPERTY: &str = "URL";
const DEFAULT_TAGS_PROPERTY: &str = "Tags";

/// Destination database of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    pub database_id: Option<String>,
    pub title_property: String,
    /// Environment variable that names the database, shown when it is missing
    pub env_key: &'static str,
}

/// Link database with its extra property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub store: StoreTarget,
    pub url_property: String,
    pub tags_property: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub idea: StoreTarget,
    pub task: StoreTarget,
    pub link: LinkTarget,
    /// Task property questions in declared order
    pub task_properties: Vec<PropertySlot>,
}

impl CaptureConfig {
    pub fn from_settings(settings: &NotebotSettings) -> Self {
        let notion = &settings.notion;

        let target = |database_id: &Option<String>,
                      title_property: &Option<String>,
                      db_env: &'static str,
                      title_env: &str| StoreTarget {
            database_id: get_with_env_fallback(database_id, &[db_env], None),
            title_property: get_with_env_fallback(
                title_property,
                &[title_env],
                Some(DEFAULT_TITLE_PROPERTY.to_string()),
            )
            .unwrap_or_else(|| DEFAULT_TITLE_PROPERTY.to_string()),
            env_key: db_env,
        };

        let idea = target(
            &notion.idea.database_id,
            &notion.idea.title_property,
            "NOTION_DATABASE_ID_IDEA",
            "NOTION_IDEA_TITLE_PROP",
        );
        let task = target(
            &notion.task.database_id,
            &notion.task.title_property,
            "NOTION_DATABASE_ID_TASK",
            "NOTION_TASK_TITLE_PROP",
        );
        let link = LinkTarget {
            store: target(
                &notion.link.database_id,
                &notion.link.title_property,
                "NOTION_DATABASE_ID_LINK",
                "NOTION_LINK_TITLE_PROP",
            ),
            url_property: get_with_env_fallback(
                &notion.link.url_property,
                &["NOTION_LINK_URL_PROP"],
                None,
            )
            .unwrap_or_else(|| DEFAULT_URL_PROPERTY.to_string()),
            tags_property: get_with_env_fallback(
                &notion.link.tags_property,
                &["NOTION_LINK_TAGS_PROP"],
                None,
            )
            .unwrap_or_else(|| DEFAULT_TAGS_PROPERTY.to_string()),
        };

        let task_properties = notion
            .task
            .properties
            .iter()
            .map(resolve_property_slot)
            .collect();

        Self {
            idea,
            task,
            link,
            task_properties,
        }
    }

    pub fn target(&self, category: Category) -> &StoreTarget {
        match category {
            Category::Idea => &self.idea,
            Category::Task => &self.task,
            Category::Link => &self.link.store,
        }
    }

    /// Database id for `category`, or a configuration error naming the missing key.
    pub fn database_for(&self, category: Category) -> Result<&str, CaptureError> {
        let target = self.target(category);
        target
            .database_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CaptureError::missing(target.env_key, category.label()))
    }
}

fn resolve_property_slot(settings: &TaskPropertySettings) -> PropertySlot {
    let env: Vec<&str> = settings.env.as_deref().into_iter().collect();
    PropertySlot {
        field: get_with_env_fallback(&settings.field, &env, None),
        label: settings.label.clone(),
    }
}
