//! Subject-grouped, reference-linked thread assembly.
//!
//! Records are first grouped by normalized subject. Inside each group every
//! record not yet placed climbs its reply targets to the topmost reachable
//! ancestor, and a breadth-first walk from there collects one chain. The
//! visited set is shared across groups, so a record is emitted exactly once
//! even when references cross subject lines.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::model::record::MessageRecord;

use super::index::ReferenceIndex;
use super::order;

/// One connected component of the reply graph within a subject group,
/// sorted chronologically.
pub type Chain<'a> = Vec<&'a MessageRecord>;

/// All chains sharing a normalized subject.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation<'a> {
    pub thread_key: String,
    pub chains: Vec<Chain<'a>>,
}

impl Conversation<'_> {
    /// Number of messages across all chains.
    pub fn message_count(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }
}

/// Rebuild conversations from a flat record slice.
///
/// Conversations come out in first-seen subject order; chains within one in
/// the order their first member was encountered. Dangling, cyclic and
/// self-referencing reply targets degrade to "treat as root". The only
/// error is a record that cannot be identified at all.
pub fn assemble(records: &[MessageRecord]) -> Result<Vec<Conversation<'_>>> {
    let index = ReferenceIndex::build(records)?;
    let groups = group_by_subject(records);
    let mut visited = vec![false; records.len()];
    let mut conversations = Vec::with_capacity(groups.len());

    for (thread_key, members) in groups {
        let mut chains = Vec::new();

        for &start in &members {
            if visited[start] {
                continue;
            }
            let root = resolve_root(&index, start, &visited, members.len());
            let mut chain: Chain<'_> = collect_chain(&index, root, &mut visited)
                .into_iter()
                .map(|pos| &records[pos])
                .collect();
            order::order(&mut chain);
            chains.push(chain);
        }

        if chains.is_empty() {
            debug!(thread = %thread_key, "All messages already threaded under another subject");
            continue;
        }
        conversations.push(Conversation { thread_key, chains });
    }

    debug!(
        records = records.len(),
        conversations = conversations.len(),
        "Assembled threads"
    );
    Ok(conversations)
}

/// Group record positions by normalized subject, keeping first-seen order.
fn group_by_subject(records: &[MessageRecord]) -> Vec<(String, Vec<usize>)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (pos, record) in records.iter().enumerate() {
        let key = record.subject_normalized.as_str();
        match slots.get(key) {
            Some(&slot) => groups[slot].1.push(pos),
            None => {
                slots.insert(key, groups.len());
                groups.push((key.to_string(), vec![pos]));
            }
        }
    }

    groups
}

/// Climb reply targets from `start` while the parent resolves and has not
/// been placed yet. At most `cap` steps, so reference cycles terminate.
fn resolve_root(index: &ReferenceIndex, start: usize, visited: &[bool], cap: usize) -> usize {
    let mut root = start;
    for _ in 0..cap.max(1) {
        match index.parent(root) {
            Some(parent) if !visited[parent] => root = parent,
            _ => break,
        }
    }
    root
}

/// Breadth-first walk over replies from `root`, claiming every unvisited
/// record it reaches.
fn collect_chain(index: &ReferenceIndex, root: usize, visited: &mut [bool]) -> Vec<usize> {
    let mut chain = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(pos) = queue.pop_front() {
        if visited[pos] {
            continue;
        }
        // Mark before enqueuing children: self and cyclic references stop here.
        visited[pos] = true;
        chain.push(pos);
        queue.extend(index.children(pos).iter().copied().filter(|&c| !visited[c]));
    }

    chain
}
