//! Notion record store integration.
//!
//! The capture flow only talks to the store through the [`RecordStore`]
//! trait; [`NotionClient`] is the HTTP implementation. On top of it sit the
//! [`PropertyResolver`] (which options may a field take) and the
//! [`RecordCommitter`] (turn a finished session into write calls).

pub mod client;
pub mod committer;
pub mod resolver;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{NotionClient, NotionConfig};
pub use committer::{CommitError, CommitOutcome, CommitStep, RecordCommitter};
pub use resolver::{FieldChoices, PropertyResolver};

/// Record store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store not configured: {0} is missing")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Request(err.to_string())
    }
}

/// Identifier of a created record (a Notion page id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a database field as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Select,
    MultiSelect,
    /// Any non-discrete kind, carrying the store's type name
    Other(String),
}

impl FieldKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "select" => FieldKind::Select,
            "multi_select" => FieldKind::MultiSelect,
            other => FieldKind::Other(other.to_string()),
        }
    }

    /// Whether values come from a predefined option set.
    pub fn is_discrete(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::MultiSelect)
    }
}

/// Schema of one database field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub kind: FieldKind,
    /// Option labels in store order (empty for non-discrete kinds)
    pub options: Vec<String>,
}

/// A field value ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    SingleChoice(String),
    MultiChoice(Vec<String>),
    Url(String),
    /// Passed through unmodified
    Raw(serde_json::Value),
}

pub type FieldValues = BTreeMap<String, EncodedValue>;

/// Abstract contract of the external structured-data service.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Describe a field of a database; `Ok(None)` when the field does not exist.
    async fn describe_field(
        &self,
        store_id: &str,
        field_name: &str,
    ) -> Result<Option<FieldDescription>, StoreError>;

    /// Create a record with only its title set.
    async fn create_record(
        &self,
        store_id: &str,
        title_field: &str,
        title_value: &str,
    ) -> Result<RecordId, StoreError>;

    /// Write field values onto an existing record.
    async fn update_record(
        &self,
        record_id: &RecordId,
        fields: &FieldValues,
    ) -> Result<(), StoreError>;

    /// Append paragraphs of text to the record body.
    async fn append_content_blocks(
        &self,
        record_id: &RecordId,
        paragraphs: &[String],
    ) -> Result<(), StoreError>;
}
