//! Record committer: turns a finished capture into record store writes.
//!
//! The primary record is created first. Every later step (property values,
//! summary paragraphs) is best-effort: when it fails the record is kept and
//! the commit reports [`CommitOutcome::Partial`] instead of an error.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use super::{EncodedValue, FieldKind, FieldValues, RecordId, RecordStore, StoreError};
use crate::config::LinkTarget;
use crate::conversation::PropertyValue;
use crate::enrichment::LinkSummary;

/// Title used for a link record when enrichment produced none.
const DEFAULT_LINK_TITLE: &str = "Ссылка";

/// Step that may fail after the record already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Properties,
    Content,
}

impl std::fmt::Display for CommitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitStep::Properties => write!(f, "properties"),
            CommitStep::Content => write!(f, "content"),
        }
    }
}

/// Result of a commit whose primary record was created.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Created {
        record_id: RecordId,
    },
    Partial {
        record_id: RecordId,
        failed_step: CommitStep,
        error: String,
    },
}

impl CommitOutcome {
    pub fn record_id(&self) -> &RecordId {
        match self {
            CommitOutcome::Created { record_id } | CommitOutcome::Partial { record_id, .. } => {
                record_id
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CommitOutcome::Created { .. })
    }
}

/// The primary record could not be created; nothing was written.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Failed to create record: {0}")]
    Create(#[from] StoreError),
}

/// Encode collected property values according to the kinds reported by the store.
///
/// A single label on a multi-select field becomes a one-element list; a
/// field of unknown kind is passed through unmodified.
pub fn encode_properties(
    properties: &BTreeMap<String, PropertyValue>,
    kinds: &HashMap<String, FieldKind>,
) -> FieldValues {
    properties
        .iter()
        .map(|(field, value)| {
            let encoded = match (kinds.get(field), value) {
                (Some(FieldKind::Select), PropertyValue::Single(label)) => {
                    EncodedValue::SingleChoice(label.clone())
                }
                (Some(FieldKind::Select), PropertyValue::Multi(labels)) => {
                    match labels.first() {
                        Some(first) => EncodedValue::SingleChoice(first.clone()),
                        None => EncodedValue::Raw(serde_json::Value::Null),
                    }
                }
                (Some(FieldKind::MultiSelect), PropertyValue::Single(label)) => {
                    EncodedValue::MultiChoice(vec![label.clone()])
                }
                (Some(FieldKind::MultiSelect), PropertyValue::Multi(labels)) => {
                    EncodedValue::MultiChoice(labels.clone())
                }
                (_, value) => EncodedValue::Raw(value.to_json()),
            };
            (field.clone(), encoded)
        })
        .collect()
}

/// Split a summary into non-empty paragraphs, one block each.
pub fn summary_paragraphs(summary: &str) -> Vec<String> {
    summary
        .split('\n')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct RecordCommitter {
    store: Arc<dyn RecordStore>,
}

impl RecordCommitter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create an idea or task record with its collected properties.
    pub async fn commit(
        &self,
        store_id: &str,
        title_field: &str,
        title: &str,
        properties: &BTreeMap<String, PropertyValue>,
        kinds: &HashMap<String, FieldKind>,
    ) -> Result<CommitOutcome, CommitError> {
        let record_id = self
            .store
            .create_record(store_id, title_field, title)
            .await?;

        if properties.is_empty() {
            return Ok(CommitOutcome::Created { record_id });
        }

        let fields = encode_properties(properties, kinds);
        Ok(self
            .follow_up(record_id, CommitStep::Properties, |id| async move {
                self.store.update_record(&id, &fields).await
            })
            .await)
    }

    /// Create a link record: title, URL and tags, then the summary as paragraphs.
    pub async fn commit_link(
        &self,
        store_id: &str,
        target: &LinkTarget,
        link: &LinkSummary,
    ) -> Result<CommitOutcome, CommitError> {
        let title = if link.title.trim().is_empty() {
            DEFAULT_LINK_TITLE
        } else {
            link.title.as_str()
        };

        let record_id = self
            .store
            .create_record(store_id, &target.store.title_property, title)
            .await?;

        let mut fields = FieldValues::new();
        fields.insert(target.url_property.clone(), EncodedValue::Url(link.url.clone()));
        let tags: Vec<String> = link.tags.iter().filter(|t| !t.is_empty()).cloned().collect();
        if !tags.is_empty() {
            fields.insert(target.tags_property.clone(), EncodedValue::MultiChoice(tags));
        }

        let outcome = self
            .follow_up(record_id, CommitStep::Properties, |id| async move {
                self.store.update_record(&id, &fields).await
            })
            .await;
        let record_id = match outcome {
            CommitOutcome::Created { record_id } => record_id,
            partial => return Ok(partial),
        };

        let paragraphs = summary_paragraphs(&link.summary);
        if paragraphs.is_empty() {
            return Ok(CommitOutcome::Created { record_id });
        }

        Ok(self
            .follow_up(record_id, CommitStep::Content, |id| async move {
                self.store.append_content_blocks(&id, &paragraphs).await
            })
            .await)
    }

    /// Run a step on an existing record; a failure downgrades the outcome to partial.
    async fn follow_up<F, Fut>(
        &self,
        record_id: RecordId,
        step: CommitStep,
        call: F,
    ) -> CommitOutcome
    where
        F: FnOnce(RecordId) -> Fut,
        Fut: std::future::Future<Output = Result<(), StoreError>>,
    {
        match call(record_id.clone()).await {
            Ok(()) => CommitOutcome::Created { record_id },
            Err(e) => {
                tracing::error!(
                    "Record {} created but writing {} failed: {}",
                    record_id,
                    step,
                    e
                );
                CommitOutcome::Partial {
                    record_id,
                    failed_step: step,
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreTarget;
    use crate::notion::fake::{FakeStore, StoreCall};

    fn link_target() -> LinkTarget {
        LinkTarget {
            store: StoreTarget {
                database_id: Some("links".to_string()),
                title_property: "Name".to_string(),
                env_key: "NOTION_DATABASE_ID_LINK",
            },
            url_property: "URL".to_string(),
            tags_property: "Tags".to_string(),
        }
    }

    fn summary(title: &str, summary: &str, tags: &[&str]) -> LinkSummary {
        LinkSummary {
            title: title.to_string(),
            summary: summary.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn encodes_by_field_kind() {
        let mut props = BTreeMap::new();
        props.insert("Type".to_string(), PropertyValue::Single("Bug".to_string()));
        props.insert("Tags".to_string(), PropertyValue::Single("rust".to_string()));
        props.insert(
            "Labels".to_string(),
            PropertyValue::Multi(vec!["a".to_string(), "b".to_string()]),
        );
        props.insert("Status".to_string(), PropertyValue::Single("Done".to_string()));

        let mut kinds = HashMap::new();
        kinds.insert("Type".to_string(), FieldKind::Select);
        kinds.insert("Tags".to_string(), FieldKind::MultiSelect);
        kinds.insert("Labels".to_string(), FieldKind::MultiSelect);
        kinds.insert("Status".to_string(), FieldKind::Other("status".to_string()));

        let fields = encode_properties(&props, &kinds);
        assert_eq!(fields["Type"], EncodedValue::SingleChoice("Bug".to_string()));
        assert_eq!(fields["Tags"], EncodedValue::MultiChoice(vec!["rust".to_string()]));
        assert_eq!(
            fields["Labels"],
            EncodedValue::MultiChoice(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(fields["Status"], EncodedValue::Raw(serde_json::json!("Done")));
    }

    #[test]
    fn unknown_kind_passes_lists_through() {
        let mut props = BTreeMap::new();
        props.insert(
            "X".to_string(),
            PropertyValue::Multi(vec!["a".to_string(), "b".to_string()]),
        );

        let fields = encode_properties(&props, &HashMap::new());
        assert_eq!(fields["X"], EncodedValue::Raw(serde_json::json!(["a", "b"])));
    }

    #[test]
    fn summary_is_split_into_non_empty_paragraphs() {
        assert_eq!(
            summary_paragraphs("First.\n\nSecond.\n"),
            vec!["First.".to_string(), "Second.".to_string()]
        );
        assert!(summary_paragraphs("").is_empty());
    }

    #[tokio::test]
    async fn commit_without_properties_only_creates() {
        let store = Arc::new(FakeStore::new());
        let committer = RecordCommitter::new(store.clone());

        let outcome = committer
            .commit("ideas", "Name", "Buy milk", &BTreeMap::new(), &HashMap::new())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(store.calls().len(), 1);
        assert_eq!(store.created(), vec![("ideas".to_string(), "Buy milk".to_string())]);
    }

    #[tokio::test]
    async fn create_failure_is_an_error() {
        let store = Arc::new(FakeStore::new());
        *store.fail_create.lock() = true;
        let committer = RecordCommitter::new(store.clone());

        let result = committer
            .commit("ideas", "Name", "Buy milk", &BTreeMap::new(), &HashMap::new())
            .await;

        assert!(matches!(result, Err(CommitError::Create(_))));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn property_failure_keeps_the_record() {
        let store = Arc::new(FakeStore::new());
        *store.fail_update.lock() = true;
        let committer = RecordCommitter::new(store.clone());

        let mut props = BTreeMap::new();
        props.insert("Type".to_string(), PropertyValue::Single("Bug".to_string()));

        let outcome = committer
            .commit("tasks", "Name", "Write report", &props, &HashMap::new())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CommitOutcome::Partial { failed_step: CommitStep::Properties, .. }
        ));
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn link_commit_writes_url_tags_and_summary() {
        let store = Arc::new(FakeStore::new());
        let committer = RecordCommitter::new(store.clone());

        let outcome = committer
            .commit_link(
                "links",
                &link_target(),
                &summary("Example", "Line one\nLine two", &["web", ""]),
            )
            .await
            .unwrap();

        assert!(outcome.is_complete());
        let calls = store.calls();
        assert_eq!(calls.len(), 3);
        let StoreCall::Update { fields, .. } = &calls[1] else {
            panic!("expected update, got {:?}", calls[1]);
        };
        assert_eq!(fields["URL"], EncodedValue::Url("https://example.com".to_string()));
        assert_eq!(fields["Tags"], EncodedValue::MultiChoice(vec!["web".to_string()]));
        assert!(matches!(
            &calls[2],
            StoreCall::Append { paragraphs, .. } if paragraphs.len() == 2
        ));
    }

    #[tokio::test]
    async fn link_without_tags_omits_tag_field() {
        let store = Arc::new(FakeStore::new());
        let committer = RecordCommitter::new(store.clone());

        committer
            .commit_link("links", &link_target(), &summary("", "", &[]))
            .await
            .unwrap();

        assert_eq!(store.created(), vec![("links".to_string(), "Ссылка".to_string())]);
        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert!(!updates[0].contains_key("Tags"));
    }

    #[tokio::test]
    async fn summary_failure_is_partial_success() {
        let store = Arc::new(FakeStore::new());
        *store.fail_append.lock() = true;
        let committer = RecordCommitter::new(store.clone());

        let outcome = committer
            .commit_link("links", &link_target(), &summary("Example", "Body", &[]))
            .await
            .unwrap();

        match outcome {
            CommitOutcome::Partial { failed_step, record_id, .. } => {
                assert_eq!(failed_step, CommitStep::Content);
                assert_eq!(record_id, RecordId("page-1".to_string()));
            }
            other => panic!("expected partial outcome, got {:?}", other),
        }
    }
}
