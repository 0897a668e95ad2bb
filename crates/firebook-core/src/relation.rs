//! Parent/child relations that carry a denormalized counter.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::domain::RecordExt;
use crate::error::StoreError;
use crate::ports::DocumentStore;

/// A child collection whose records reference a parent that counts them.
///
/// `parent.counter_field` should equal the number of child records whose
/// `parent_ref_field` holds the parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationConfig {
    pub child_collection: String,
    pub parent_ref_field: String,
    pub parent_collection: String,
    pub counter_field: String,
}

impl RelationConfig {
    pub fn new(
        child_collection: impl Into<String>,
        parent_ref_field: impl Into<String>,
        parent_collection: impl Into<String>,
        counter_field: impl Into<String>,
    ) -> Self {
        Self {
            child_collection: child_collection.into(),
            parent_ref_field: parent_ref_field.into(),
            parent_collection: parent_collection.into(),
            counter_field: counter_field.into(),
        }
    }

    /// Comments counted on their post.
    pub fn post_comments() -> Self {
        Self::new("comments", "postId", "posts", "totalComments")
    }

    /// Parse a comma separated list of `child:ref:parent:counter` entries.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, RelationParseError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for RelationConfig {
    type Err = RelationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [child, reference, parent, counter]
                if parts.iter().all(|part| !part.is_empty()) =>
            {
                Ok(Self::new(*child, *reference, *parent, *counter))
            }
            _ => Err(RelationParseError(s.to_string())),
        }
    }
}

impl fmt::Display for RelationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.child_collection, self.parent_ref_field, self.parent_collection, self.counter_field
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid relation `{0}`, expected child:refField:parent:counterField")]
pub struct RelationParseError(pub String);

/// Outcome of a [`reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Parent records inspected.
    pub checked: usize,
    /// Parent records whose counter was rewritten.
    pub corrected: usize,
}

/// Recompute every parent counter from the live children.
///
/// Incremental counter updates drift when a child write and its counter
/// write are separated by a crash; this puts the invariant back.
pub async fn reconcile(
    store: &dyn DocumentStore,
    relations: &[RelationConfig],
) -> Result<ReconcileReport, StoreError> {
    let mut report = ReconcileReport::default();

    for relation in relations {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for child in store.list(&relation.child_collection).await? {
            if let Some(parent_id) = child.key_of(&relation.parent_ref_field) {
                *counts.entry(parent_id).or_default() += 1;
            }
        }

        for parent in store.list(&relation.parent_collection).await? {
            let Some(id) = parent.id_key() else {
                continue;
            };
            report.checked += 1;

            let expected = counts.get(&id).copied().unwrap_or(0);
            let current = parent.get(&relation.counter_field).and_then(Value::as_i64);
            if current != Some(expected) {
                store
                    .update_field(
                        &relation.parent_collection,
                        &id,
                        &relation.counter_field,
                        Value::from(expected),
                    )
                    .await?;
                report.corrected += 1;
            }
        }
    }

    Ok(report)
}
