//! Mailbox retrieval: raw message blobs from local MBOX files and `.eml`
//! directories, plus the subject filter applied to them.

pub mod eml;
pub mod filter;
pub mod mbox;

use std::path::Path;

use crate::error::{Result, ThreadError};

pub use eml::EmlDirSource;
pub use filter::SubjectFilter;
pub use mbox::MboxSource;

/// Undecoded message bytes and where they came from.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Label of the originating mailbox.
    pub mailbox: String,
    /// 0-based position within the mailbox.
    pub sequence: u64,
    /// RFC 5322 bytes, possibly still prefixed by an MBOX `From ` line.
    pub data: Vec<u8>,
}

/// A mailbox folder that can enumerate its messages.
pub trait MailboxSource {
    /// Human-readable mailbox name, used for synthetic ids and exports.
    fn label(&self) -> &str;

    /// Call `on_message` for every message in mailbox order.
    ///
    /// The callback returns `false` to stop early. Returns the number of
    /// messages delivered.
    fn for_each_message(&self, on_message: &mut dyn FnMut(RawMessage) -> bool) -> Result<u64>;
}

/// Open `path` as a mailbox: directories are read as `.eml` folders, files
/// as MBOX.
pub fn open_source(path: &Path, max_message_size: usize) -> Result<Box<dyn MailboxSource>> {
    let metadata = std::fs::metadata(path).map_err(|e| ThreadError::open(path, e))?;
    if metadata.is_dir() {
        Ok(Box::new(EmlDirSource::new(path)?))
    } else if metadata.is_file() {
        Ok(Box::new(MboxSource::new(path)?.with_max_message_size(max_message_size)))
    } else {
        Err(ThreadError::InvalidMailbox(path.to_path_buf()))
    }
}

/// Mailbox label for a path: the file stem, or the directory name.
pub fn mailbox_label(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "mailbox".to_string())
}
