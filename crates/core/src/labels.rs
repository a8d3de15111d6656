//! Label vocabulary reconciliation.
//!
//! Two instances assign unrelated ids to the same label names. The mapping
//! between them is built by exact, case-sensitive name equality.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::RemoteId;

/// A label of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: RemoteId,
    pub name: String,
}

impl Label {
    pub fn new(id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Partial function `source label id -> target label id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelMapping {
    ids: BTreeMap<RemoteId, RemoteId>,
    /// Source labels with no target equivalent, by id.
    unmatched: BTreeMap<RemoteId, String>,
}

impl LabelMapping {
    pub fn get(&self, source: RemoteId) -> Option<RemoteId> {
        self.ids.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Names of source labels that have no target equivalent.
    pub fn unmatched_names(&self) -> Vec<String> {
        self.unmatched.values().cloned().collect()
    }

    /// Display name for a source label id that could not be mapped.
    ///
    /// Falls back to `ID {id}` for ids unknown to the source vocabulary.
    pub fn describe_unmapped(&self, id: RemoteId) -> String {
        self.unmatched
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("ID {id}"))
    }

    /// Names for a set of unmapped ids, in id order.
    pub fn describe_all(&self, ids: &BTreeSet<RemoteId>) -> Vec<String> {
        ids.iter().map(|id| self.describe_unmapped(*id)).collect()
    }
}

/// Map every source label to the target label with the same name.
pub fn reconcile(source: &[Label], target: &[Label]) -> LabelMapping {
    let target_by_name: HashMap<&str, RemoteId> =
        target.iter().map(|l| (l.name.as_str(), l.id)).collect();

    let mut mapping = LabelMapping::default();
    for label in source {
        match target_by_name.get(label.name.as_str()) {
            Some(target_id) => {
                mapping.ids.insert(label.id, *target_id);
            }
            None => {
                mapping.unmatched.insert(label.id, label.name.clone());
            }
        }
    }
    mapping
}
