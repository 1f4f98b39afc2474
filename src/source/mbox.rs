//! Streaming MBOX reader.
//!
//! Reads line-by-line through a large buffer and never loads the whole file.
//! Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, ThreadError};

use super::{mailbox_label, MailboxSource, RawMessage};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (256 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// An MBOX file viewed as one mailbox folder.
///
/// Handles:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - UTF-8 BOM at the start of the file
/// - Oversized messages, which are cut at `max_message_size`
pub struct MboxSource {
    path: PathBuf,
    label: String,
    file_size: u64,
    max_message_size: usize,
}

impl MboxSource {
    /// Open the MBOX at `path`. Checks that the file exists, not that it is
    /// actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| ThreadError::open(&path, e))?;
        Ok(Self {
            label: mailbox_label(&path),
            path,
            file_size: metadata.len(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MailboxSource for MboxSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn for_each_message(&self, on_message: &mut dyn FnMut(RawMessage) -> bool) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ThreadError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut message: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut line: Vec<u8> = Vec::with_capacity(4096);
        let mut prev_blank = true;
        let mut first_line = true;
        let mut truncated = false;

        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| ThreadError::io(&self.path, e))?;
            if n == 0 {
                break;
            }

            if is_separator(&line) {
                if !first_line && !prev_blank {
                    warn!(
                        mailbox = %self.label,
                        offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if !message.is_empty() {
                    let raw = RawMessage {
                        mailbox: self.label.clone(),
                        sequence: count,
                        data: std::mem::take(&mut message),
                    };
                    count += 1;
                    if !on_message(raw) {
                        return Ok(count);
                    }
                }
                truncated = false;
                message.extend_from_slice(&line);
            } else if message.len() + line.len() <= self.max_message_size {
                message.extend_from_slice(&line);
            } else if !truncated {
                warn!(
                    mailbox = %self.label,
                    sequence = count,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_blank = is_blank_line(&line);
            first_line = false;
            offset += n as u64;
        }

        if !message.is_empty() {
            let raw = RawMessage {
                mailbox: self.label.clone(),
                sequence: count,
                data: message,
            };
            count += 1;
            on_message(raw);
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_separator(line: &[u8]) -> bool {
    line.strip_prefix(&[0xEF, 0xBB, 0xBF])
        .unwrap_or(line)
        .starts_with(b"From ")
}

/// Check whether a line is blank (only whitespace, CR or LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
