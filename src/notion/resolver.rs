//! Property resolver: which discrete options does a task field offer?

use std::sync::Arc;

use super::{FieldKind, RecordStore, StoreError};

/// Options and kind of a discrete-choice field.
///
/// `options` is empty and `kind` is `None` when the field does not exist or
/// is not a select/multi-select field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldChoices {
    pub options: Vec<String>,
    pub kind: Option<FieldKind>,
}

impl FieldChoices {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Queries the record store for the choices of a field. Never caches.
#[derive(Clone)]
pub struct PropertyResolver {
    store: Arc<dyn RecordStore>,
}

impl PropertyResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve the option labels of `field_name` in `store_id`.
    ///
    /// A lookup failure is an `Err`, distinct from a field with no options.
    pub async fn resolve(
        &self,
        store_id: &str,
        field_name: &str,
    ) -> Result<FieldChoices, StoreError> {
        match self.store.describe_field(store_id, field_name).await? {
            Some(desc) if desc.kind.is_discrete() => Ok(FieldChoices {
                options: desc.options,
                kind: Some(desc.kind),
            }),
            Some(desc) => {
                tracing::debug!(
                    "Field '{}' is {:?}, not a choice field; skipping",
                    field_name,
                    desc.kind
                );
                Ok(FieldChoices::default())
            }
            None => {
                tracing::debug!("Field '{}' not found in database {}", field_name, store_id);
                Ok(FieldChoices::default())
            }
        }
    }
}
