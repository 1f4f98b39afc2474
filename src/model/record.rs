//! The decoded message record consumed by the thread engine.

use std::path::PathBuf;

use crate::thread::subject::{self, Prefix};

/// How a message relates to the conversation it belongs to.
///
/// Computed once from the subject and the presence of a reply target;
/// records never change kind afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    New,
    Reply,
    Forward,
}

impl MessageKind {
    /// Classify a message.
    ///
    /// A reply target always wins, so a forwarded message sent with
    /// `In-Reply-To` counts as a reply.
    pub fn classify(subject_raw: &str, has_reply_target: bool) -> Self {
        if has_reply_target {
            return Self::Reply;
        }
        match subject::leading_prefix(subject_raw.trim()) {
            Some((Prefix::Reply, _)) => Self::Reply,
            Some((Prefix::Forward, _)) => Self::Forward,
            None => Self::New,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reply => "reply",
            Self::Forward => "forward",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved, decoded message.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// `Message-ID` as found in the headers. May be empty.
    pub id: String,

    /// Identifier this message replies to (`In-Reply-To`, else the last
    /// `References` entry). `None` when absent or blank.
    pub reply_target: Option<String>,

    /// Decoded subject line.
    pub subject_raw: String,

    /// Subject with reply/forward prefixes removed; the grouping key.
    pub subject_normalized: String,

    pub kind: MessageKind,

    pub from: String,

    pub to: String,

    /// Raw `Date:` header text, parsed only when ordering.
    pub date: String,

    /// Concatenated plain-text body.
    pub body: String,

    /// Files the attachments were written to.
    pub attachment_paths: Vec<PathBuf>,

    /// Folder holding this message's attachments, if any were saved.
    pub attachment_dir: Option<PathBuf>,

    /// Label of the mailbox the message came from.
    pub mailbox: String,

    /// 0-based position within `mailbox`.
    pub sequence: u64,
}

impl MessageRecord {
    /// Create a record with an empty payload.
    ///
    /// The normalized subject and kind are derived here so every record
    /// carries exactly one grouping key.
    pub fn new(
        mailbox: impl Into<String>,
        sequence: u64,
        id: &str,
        subject_raw: &str,
        reply_target: Option<&str>,
    ) -> Self {
        let reply_target = reply_target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        Self {
            id: id.trim().to_string(),
            kind: MessageKind::classify(subject_raw, reply_target.is_some()),
            reply_target,
            subject_raw: subject_raw.to_string(),
            subject_normalized: subject::normalize(subject_raw),
            from: String::new(),
            to: String::new(),
            date: String::new(),
            body: String::new(),
            attachment_paths: Vec::new(),
            attachment_dir: None,
            mailbox: mailbox.into(),
            sequence,
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn with_from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn with_to(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Key identifying this record in the reference graph.
    ///
    /// The normalized `Message-ID`, or `__synth_<mailbox>_<sequence>__` when
    /// the message carries none.
    pub fn key(&self) -> String {
        let id = normalize_id(&self.id);
        if id.is_empty() {
            format!("__synth_{}_{}__", self.mailbox, self.sequence)
        } else {
            id
        }
    }

    /// Normalized reply target, excluding blanks and self references.
    pub fn parent_key(&self) -> Option<String> {
        let target = normalize_id(self.reply_target.as_deref()?);
        if target.is_empty() || target == normalize_id(&self.id) {
            None
        } else {
            Some(target)
        }
    }

    /// Whether [`key`](Self::key) can be derived at all.
    pub fn has_identity(&self) -> bool {
        !normalize_id(&self.id).is_empty() || !self.mailbox.is_empty()
    }
}

/// Normalize a Message-ID by stripping angle brackets and whitespace.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

/// Pick the reply target from `In-Reply-To`, falling back to the last
/// `References` entry.
pub fn reply_target_from_headers(in_reply_to: Option<&str>, references: &[String]) -> Option<String> {
    in_reply_to
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            references
                .iter()
                .rev()
                .map(|r| r.trim())
                .find(|r| !r.is_empty())
        })
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("<msg001@example.com>"), "msg001@example.com");
        assert_eq!(normalize_id("msg001@example.com"), "msg001@example.com");
        assert_eq!(normalize_id("  <msg@ex.com>  "), "msg@ex.com");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn test_kind_reply_from_target() {
        assert_eq!(MessageKind::classify("Budget", true), MessageKind::Reply);
        assert_eq!(MessageKind::classify("Fwd: Budget", true), MessageKind::Reply);
    }

    #[test]
    fn test_kind_from_subject() {
        assert_eq!(MessageKind::classify("RE: Budget", false), MessageKind::Reply);
        assert_eq!(MessageKind::classify("Fwd: Budget", false), MessageKind::Forward);
        assert_eq!(MessageKind::classify("fw: Budget", false), MessageKind::Forward);
        assert_eq!(MessageKind::classify("Budget", false), MessageKind::New);
        assert_eq!(MessageKind::classify("", false), MessageKind::New);
    }

    #[test]
    fn test_blank_reply_target_is_none() {
        let r = MessageRecord::new("INBOX", 0, "<a@x>", "Hi", Some("   "));
        assert_eq!(r.reply_target, None);
        assert_eq!(r.kind, MessageKind::New);
    }

    #[test]
    fn test_synthetic_key() {
        let r = MessageRecord::new("INBOX", 7, "", "Hi", None);
        assert_eq!(r.key(), "__synth_INBOX_7__");
        let r = MessageRecord::new("INBOX", 7, "<a@x>", "Hi", None);
        assert_eq!(r.key(), "a@x");
    }

    #[test]
    fn test_self_reference_has_no_parent() {
        let r = MessageRecord::new("INBOX", 0, "<a@x>", "Re: Hi", Some("a@x"));
        assert_eq!(r.parent_key(), None);
        let r = MessageRecord::new("INBOX", 0, "<a@x>", "Re: Hi", Some("<b@x>"));
        assert_eq!(r.parent_key().as_deref(), Some("b@x"));
    }

    #[test]
    fn test_reply_target_fallback_to_references() {
        let refs = vec!["<a@x>".to_string(), "<b@x>".to_string()];
        assert_eq!(
            reply_target_from_headers(None, &refs).as_deref(),
            Some("<b@x>")
        );
        assert_eq!(
            reply_target_from_headers(Some(" "), &refs).as_deref(),
            Some("<b@x>")
        );
        assert_eq!(
            reply_target_from_headers(Some("<c@x>"), &refs).as_deref(),
            Some("<c@x>")
        );
        assert_eq!(reply_target_from_headers(None, &[]), None);
    }
}
