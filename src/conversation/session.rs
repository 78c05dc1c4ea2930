//! Per-conversation scratch space.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::notion::FieldKind;

/// What the user is capturing. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Idea,
    Task,
    Link,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Idea, Category::Task, Category::Link];

    /// Parse a keyboard label; anything else is not a category.
    pub fn from_label(text: &str) -> Option<Self> {
        match text.trim() {
            "Идея" => Some(Category::Idea),
            "Задача" => Some(Category::Task),
            "Ссылка" => Some(Category::Link),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Idea => "Идея",
            Category::Task => "Задача",
            Category::Link => "Ссылка",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No capture in progress
    #[default]
    Idle,
    /// Waiting for a category
    Choosing,
    /// Waiting for the idea or task text (or a voice note)
    TypingReply,
    /// Waiting for a URL
    AwaitingLink,
    /// Waiting for the value of task property `slot`
    SelectingProperty { slot: usize },
}

/// One configured task property question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySlot {
    /// Store field key; `None` when not configured (the slot is skipped)
    pub field: Option<String>,
    /// Label shown to the user
    pub label: String,
}

impl PropertySlot {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            label: label.into(),
        }
    }
}

/// A collected property answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Single(String),
    Multi(Vec<String>),
}

impl PropertyValue {
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Single(label) => Value::String(label.clone()),
            PropertyValue::Multi(labels) => {
                Value::Array(labels.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// The property question currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentField {
    pub slot: usize,
    pub field: String,
    pub options: Vec<String>,
    pub kind: Option<FieldKind>,
    pub label: String,
}

impl CurrentField {
    pub fn accepts(&self, choice: &str) -> bool {
        self.options.iter().any(|o| o == choice)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Category already chosen: {0}")]
    CategoryAlreadySet(Category),
}

/// Mutable state of one capture conversation.
///
/// Only the state machine mutates it, one event at a time.
#[derive(Debug, Clone)]
pub struct Session {
    flow_id: Uuid,
    started_at: DateTime<Utc>,
    state: ConversationState,
    category: Option<Category>,
    title: Option<String>,
    target_store_id: Option<String>,
    property_queue: Vec<PropertySlot>,
    property_cursor: usize,
    collected_properties: BTreeMap<String, PropertyValue>,
    field_kinds: HashMap<String, FieldKind>,
    current_field: Option<CurrentField>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            flow_id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: ConversationState::Idle,
            category: None,
            title: None,
            target_store_id: None,
            property_queue: Vec::new(),
            property_cursor: 0,
            collected_properties: BTreeMap::new(),
            field_kinds: HashMap::new(),
            current_field: None,
        }
    }

    /// Start a fresh capture, discarding anything collected so far.
    pub fn begin(&mut self) {
        *self = Self::new();
        self.state = ConversationState::Choosing;
    }

    /// Destroy the session contents and return to `Idle`.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Set the category. It can be set once per session.
    pub fn choose(&mut self, category: Category) -> Result<(), SessionError> {
        if let Some(existing) = self.category {
            return Err(SessionError::CategoryAlreadySet(existing));
        }
        self.category = Some(category);
        self.state = match category {
            Category::Link => ConversationState::AwaitingLink,
            Category::Idea | Category::Task => ConversationState::TypingReply,
        };
        Ok(())
    }

    /// Initialise the property loop of a task.
    pub fn start_task(
        &mut self,
        title: impl Into<String>,
        store_id: impl Into<String>,
        queue: Vec<PropertySlot>,
    ) {
        self.title = Some(title.into());
        self.target_store_id = Some(store_id.into());
        self.property_queue = queue;
        self.property_cursor = 0;
        self.collected_properties.clear();
        self.field_kinds.clear();
        self.current_field = None;
    }

    /// Slot under the cursor, `None` once the queue is exhausted.
    pub fn current_slot(&self) -> Option<&PropertySlot> {
        self.property_queue.get(self.property_cursor)
    }

    /// Move to the next slot. The cursor never passes the queue length.
    pub fn advance(&mut self) {
        self.property_cursor = (self.property_cursor + 1).min(self.property_queue.len());
        self.current_field = None;
    }

    /// Show `field` to the user and wait for the answer.
    pub fn await_property(&mut self, field: CurrentField) {
        self.state = ConversationState::SelectingProperty { slot: field.slot };
        self.current_field = Some(field);
    }

    /// Store an answer for `field`.
    pub fn record(&mut self, field: impl Into<String>, value: PropertyValue, kind: Option<FieldKind>) {
        let field = field.into();
        if let Some(kind) = kind {
            self.field_kinds.insert(field.clone(), kind);
        }
        self.collected_properties.insert(field, value);
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the flow began.
    pub fn age_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ConversationState::Idle
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn target_store_id(&self) -> Option<&str> {
        self.target_store_id.as_deref()
    }

    pub fn property_queue(&self) -> &[PropertySlot] {
        &self.property_queue
    }

    pub fn property_cursor(&self) -> usize {
        self.property_cursor
    }

    pub fn collected_properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.collected_properties
    }

    pub fn field_kinds(&self) -> &HashMap<String, FieldKind> {
        &self.field_kinds
    }

    pub fn current_field(&self) -> Option<&CurrentField> {
        self.current_field.as_ref()
    }
}
