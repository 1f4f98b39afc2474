//! Identifier lookup and reverse reply index over a record slice.
//!
//! Records are addressed by their position in the input slice, so two
//! copies of the same message (inbox and sent) stay distinct even though
//! they share an identifier.

use std::collections::HashMap;

use crate::error::{Result, ThreadError};
use crate::model::record::{normalize_id, MessageRecord};

/// Read-only adjacency structure built once per assembly call.
#[derive(Debug)]
pub struct ReferenceIndex {
    /// Graph key of every record, by position.
    keys: Vec<String>,
    /// Resolved parent key of every record, by position.
    parents: Vec<Option<String>>,
    /// Key → position of the last record carrying it.
    by_id: HashMap<String, usize>,
    /// Key → positions of records replying to it, in input order.
    children_of: HashMap<String, Vec<usize>>,
}

impl ReferenceIndex {
    /// Index `records`.
    ///
    /// Identifier collisions are resolved last-write-wins. Fails only when a
    /// record has no identifier and no mailbox label, or when two
    /// identifier-less records claim the same mailbox position.
    pub fn build(records: &[MessageRecord]) -> Result<Self> {
        let mut keys = Vec::with_capacity(records.len());
        let mut parents = Vec::with_capacity(records.len());
        let mut by_id: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut children_of: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, record) in records.iter().enumerate() {
            if !record.has_identity() {
                return Err(ThreadError::ContractViolation {
                    position: pos,
                    reason: "record has neither a message id nor a mailbox label".into(),
                });
            }

            let key = record.key();
            if let Some(&prev) = by_id.get(&key) {
                if normalize_id(&record.id).is_empty() && normalize_id(&records[prev].id).is_empty() {
                    return Err(ThreadError::ContractViolation {
                        position: pos,
                        reason: format!(
                            "duplicate mailbox position {}#{} for a message without id",
                            record.mailbox, record.sequence
                        ),
                    });
                }
                tracing::debug!(id = %key, first = prev, second = pos, "Duplicate message id");
            }
            by_id.insert(key.clone(), pos);

            let parent = record.parent_key();
            if let Some(ref p) = parent {
                children_of.entry(p.clone()).or_default().push(pos);
            }

            keys.push(key);
            parents.push(parent);
        }

        Ok(Self {
            keys,
            parents,
            by_id,
            children_of,
        })
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Graph key of the record at `pos`.
    pub fn key(&self, pos: usize) -> &str {
        &self.keys[pos]
    }

    /// Position of the record registered under `id` (last write wins).
    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Position of the parent of `pos`, if its reply target resolves.
    ///
    /// Dangling targets yield `None`.
    pub fn parent(&self, pos: usize) -> Option<usize> {
        self.parents[pos].as_deref().and_then(|p| self.lookup(p))
    }

    /// Positions of the records replying to the record at `pos`.
    pub fn children(&self, pos: usize) -> &[usize] {
        self.children_of
            .get(&self.keys[pos])
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
