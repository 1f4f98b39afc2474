//! A directory of `.eml` files read as one mailbox folder.

use std::path::{Path, PathBuf};

use crate::error::{Result, ThreadError};

use super::{mailbox_label, MailboxSource, RawMessage};

/// Every `*.eml` file directly inside a directory, in file-name order.
pub struct EmlDirSource {
    dir: PathBuf,
    label: String,
}

impl EmlDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ThreadError::FileNotFound(dir));
        }
        Ok(Self {
            label: mailbox_label(&dir),
            dir,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sorted list of `.eml` files in the directory.
    fn files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| ThreadError::io(&self.dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ThreadError::io(&self.dir, e))?.path();
            let is_eml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("eml"));
            if is_eml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl MailboxSource for EmlDirSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn for_each_message(&self, on_message: &mut dyn FnMut(RawMessage) -> bool) -> Result<u64> {
        let mut count = 0;
        for path in self.files()? {
            let data = std::fs::read(&path).map_err(|e| ThreadError::io(&path, e))?;
            let raw = RawMessage {
                mailbox: self.label.clone(),
                sequence: count,
                data,
            };
            count += 1;
            if !on_message(raw) {
                break;
            }
        }
        Ok(count)
    }
}
