//! Task property loop.
//!
//! Walks the property queue from the cursor. Slots without a configured
//! field or without options are skipped silently; the first slot that has
//! options is shown to the user. When the queue is exhausted the task is
//! ready to be committed.

use super::keyboard::SKIP_LABEL;
use super::session::{CurrentField, PropertyValue, Session};
use crate::notion::{FieldKind, PropertyResolver, StoreError};

/// What the machine should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Ask the user to pick a value for this field
    Ask(CurrentField),
    /// Queue exhausted; commit the task
    Commit,
}

/// Outcome of applying a user answer to the current field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Skipped,
    Recorded,
    /// Not one of the offered options; nothing changed
    Rejected,
}

/// Scan forward from the cursor to the next slot that needs an answer.
///
/// Every skipped slot advances the cursor, so the scan performs at most
/// one lookup per remaining slot.
pub async fn advance_and_present(
    session: &mut Session,
    resolver: &PropertyResolver,
) -> Result<Step, StoreError> {
    let Some(store_id) = session.target_store_id().map(str::to_string) else {
        return Ok(Step::Commit);
    };

    while let Some(slot) = session.current_slot().cloned() {
        let Some(field) = slot.field else {
            tracing::debug!("Property '{}' not configured, skipping", slot.label);
            session.advance();
            continue;
        };

        let choices = resolver.resolve(&store_id, &field).await?;
        if choices.is_empty() {
            tracing::debug!("Property '{}' ({}) has no options, skipping", slot.label, field);
            session.advance();
            continue;
        }

        let current = CurrentField {
            slot: session.property_cursor(),
            field,
            options: choices.options,
            kind: choices.kind,
            label: slot.label,
        };
        session.await_property(current.clone());
        return Ok(Step::Ask(current));
    }

    Ok(Step::Commit)
}

/// Apply the user's answer to the field currently shown.
pub fn accept_choice(session: &mut Session, text: &str) -> Choice {
    let Some(current) = session.current_field().cloned() else {
        return Choice::Rejected;
    };
    let text = text.trim();

    if text == SKIP_LABEL {
        session.advance();
        return Choice::Skipped;
    }
    if !current.accepts(text) {
        return Choice::Rejected;
    }

    let value = match current.kind {
        Some(FieldKind::MultiSelect) => PropertyValue::Multi(vec![text.to_string()]),
        _ => PropertyValue::Single(text.to_string()),
    };
    session.record(current.field, value, current.kind);
    session.advance();
    Choice::Recorded
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conversation::{ConversationState, PropertySlot};
    use crate::notion::fake::FakeStore;

    fn unconfigured(label: &str) -> PropertySlot {
        PropertySlot {
            field: None,
            label: label.to_string(),
        }
    }

    fn task_session(queue: Vec<PropertySlot>) -> Session {
        let mut session = Session::new();
        session.start_task("Write report", "tasks", queue);
        session
    }

    #[tokio::test]
    async fn skips_unconfigured_and_empty_slots() {
        let store = FakeStore::new()
            .with_field("tasks", "Speed", FieldKind::Select, &[])
            .with_field("tasks", "Interest", FieldKind::Select, &["Low", "High"]);
        let resolver = PropertyResolver::new(Arc::new(store));
        let mut session = task_session(vec![
            unconfigured("ТИП"),
            PropertySlot::new("Speed", "СКОРОСТЬ"),
            PropertySlot::new("Interest", "ИНТЕРЕС"),
        ]);

        let step = advance_and_present(&mut session, &resolver).await.unwrap();

        let Step::Ask(field) = step else {
            panic!("expected a prompt, got {:?}", step);
        };
        assert_eq!(field.slot, 2);
        assert_eq!(field.label, "ИНТЕРЕС");
        assert_eq!(field.options, vec!["Low", "High"]);
        assert_eq!(session.state(), ConversationState::SelectingProperty { slot: 2 });
    }

    #[tokio::test]
    async fn empty_queue_commits_immediately() {
        let resolver = PropertyResolver::new(Arc::new(FakeStore::new()));
        let mut session = task_session(Vec::new());

        assert_eq!(
            advance_and_present(&mut session, &resolver).await.unwrap(),
            Step::Commit
        );
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let store = Arc::new(FakeStore::new());
        *store.fail_describe.lock() = true;
        let resolver = PropertyResolver::new(store);
        let mut session = task_session(vec![PropertySlot::new("Type", "ТИП")]);

        assert!(advance_and_present(&mut session, &resolver).await.is_err());
    }

    #[tokio::test]
    async fn rejected_choice_changes_nothing() {
        let store = FakeStore::new().with_field("tasks", "Type", FieldKind::Select, &["Bug"]);
        let resolver = PropertyResolver::new(Arc::new(store));
        let mut session = task_session(vec![PropertySlot::new("Type", "ТИП")]);
        advance_and_present(&mut session, &resolver).await.unwrap();

        assert_eq!(accept_choice(&mut session, "Feature"), Choice::Rejected);
        assert_eq!(session.property_cursor(), 0);
        assert!(session.collected_properties().is_empty());
        assert!(session.current_field().is_some());
    }

    #[tokio::test]
    async fn multi_select_answer_is_a_list() {
        let store =
            FakeStore::new().with_field("tasks", "Tags", FieldKind::MultiSelect, &["a", "b"]);
        let resolver = PropertyResolver::new(Arc::new(store));
        let mut session = task_session(vec![PropertySlot::new("Tags", "ТЕГИ")]);
        advance_and_present(&mut session, &resolver).await.unwrap();

        assert_eq!(accept_choice(&mut session, "b"), Choice::Recorded);
        assert_eq!(
            session.collected_properties().get("Tags"),
            Some(&PropertyValue::Multi(vec!["b".to_string()]))
        );
    }

    #[tokio::test]
    async fn skip_records_nothing() {
        let store = FakeStore::new().with_field("tasks", "Type", FieldKind::Select, &["Bug"]);
        let resolver = PropertyResolver::new(Arc::new(store));
        let mut session = task_session(vec![PropertySlot::new("Type", "ТИП")]);
        advance_and_present(&mut session, &resolver).await.unwrap();

        assert_eq!(accept_choice(&mut session, SKIP_LABEL), Choice::Skipped);
        assert_eq!(session.property_cursor(), 1);
        assert!(session.collected_properties().is_empty());
        assert_eq!(
            advance_and_present(&mut session, &resolver).await.unwrap(),
            Step::Commit
        );
    }
}
