//! Output record families and the shared collection registry

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One exported content object. Created once all of metadata, relationships,
/// and handle are fetched for an identifier; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub pid: String,
    pub handle: String,
    pub media_type: String,
    pub title: String,
    pub summary: String,
    pub century: Vec<String>,
    pub date: Vec<String>,
    pub repository: String,
    pub collection_title: String,
    pub subjects: Vec<String>,
    /// Derivative URLs, one per has-part relation, in page order.
    pub file_urls: Vec<String>,
    pub member_of: Vec<String>,
}

/// One page or derivative, emitted when its owning item is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub pid: String,
    pub order: Option<u32>,
    pub label: Option<String>,
    pub url: String,
    pub parent_pid: String,
}

/// One distinct collection encountered as a membership target anywhere in the
/// batch. Children accumulate in encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub pid: String,
    pub children: Vec<String>,
}

/// Get-or-create registry of collections, shared across the whole batch.
///
/// Owned by the batch driver and passed by reference into assembly; the
/// finalized output order is first-encounter order.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    records: Vec<CollectionRecord>,
    index: HashMap<String, usize>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a snapshot (checkpoint restore).
    pub fn from_records(records: Vec<CollectionRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.pid.clone(), i))
            .collect();
        Self { records, index }
    }

    /// Append a child to a collection, creating the collection on first sight.
    /// Appending the same child twice is a no-op.
    pub fn add_member(&mut self, collection_pid: &str, child_pid: &str) {
        let i = match self.index.get(collection_pid).copied() {
            Some(i) => i,
            None => {
                let i = self.records.len();
                self.index.insert(collection_pid.to_string(), i);
                self.records.push(CollectionRecord {
                    pid: collection_pid.to_string(),
                    children: Vec::new(),
                });
                i
            }
        };
        let record = &mut self.records[i];
        if !record.children.iter().any(|c| c == child_pid) {
            record.children.push(child_pid.to_string());
        }
    }

    pub fn get(&self, collection_pid: &str) -> Option<&CollectionRecord> {
        self.index.get(collection_pid).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current state in first-encounter order, for checkpoints and finalize.
    pub fn records(&self) -> &[CollectionRecord] {
        &self.records
    }

    /// Finalize into the output list, consuming the registry.
    pub fn into_records(self) -> Vec<CollectionRecord> {
        self.records
    }
}
