//! Retrieval pipeline: raw mailbox messages → filtered, decoded records with
//! attachments written to disk.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::export::attachment::AttachmentStore;
use crate::model::record::MessageRecord;
use crate::parser::mime;
use crate::source::{MailboxSource, SubjectFilter};

/// Outcome of a retrieval run.
#[derive(Debug, Default)]
pub struct Retrieval {
    /// Matching records in retrieval order (mailbox order, then sequence).
    pub records: Vec<MessageRecord>,
    /// Messages read, matching or not.
    pub scanned: u64,
    /// Attachment files written.
    pub attachments_saved: usize,
    /// Total size of the attachment files written.
    pub attachment_bytes: u64,
}

/// Decode every message of every source, keep those whose subject matches
/// `filter`, and save their attachments when a store is given.
///
/// Sources sharing a label (`a/INBOX.mbox` and `b/INBOX.mbox`) are told
/// apart with a `#2`, `#3`, ... suffix, so message keys stay unique.
///
/// `progress` is called with the mailbox label and the running count of
/// messages read.
pub fn collect_records(
    sources: &[Box<dyn MailboxSource>],
    filter: &SubjectFilter,
    mut store: Option<&mut AttachmentStore>,
    progress: Option<&dyn Fn(&str, u64)>,
) -> Result<Retrieval> {
    let mut out = Retrieval::default();
    let mut seen_labels: HashSet<String> = HashSet::new();

    for source in sources {
        let label = unique_label(&mut seen_labels, source.label());
        let before = out.records.len();

        let read = source.for_each_message(&mut |raw| {
            out.scanned += 1;
            if let Some(cb) = progress {
                cb(&label, out.scanned);
            }

            let decoded = mime::decode(&raw);
            if !filter.matches(&decoded.subject) {
                return true;
            }

            let (mut record, parts) = decoded.into_parts();
            record.mailbox.clone_from(&label);
            if let Some(store) = store.as_deref_mut() {
                let saved = store.save(&record.subject_normalized, &parts);
                out.attachments_saved += saved.paths.len();
                out.attachment_bytes += saved.bytes;
                record.attachment_dir = saved.dir;
                record.attachment_paths = saved.paths;
            } else if !parts.is_empty() {
                debug!(
                    mailbox = %record.mailbox,
                    sequence = record.sequence,
                    count = parts.len(),
                    "Attachments not saved"
                );
            }
            out.records.push(record);
            true
        })?;

        info!(
            mailbox = %label,
            read,
            matched = out.records.len() - before,
            "Mailbox scanned"
        );
    }

    Ok(out)
}

fn unique_label(seen: &mut HashSet<String>, label: &str) -> String {
    let mut candidate = label.to_string();
    let mut n = 1;
    while seen.contains(&candidate) {
        n += 1;
        candidate = format!("{label}#{n}");
    }
    if n > 1 {
        warn!(mailbox = %label, renamed = %candidate, "Mailbox label already used");
    }
    seen.insert(candidate.clone());
    candidate
}
