//! Write decoded attachments to disk.
//!
//! Layout: `{root}/{thread folder}/{message index}/{file name}`, where the
//! message index counts every retrieved message across all mailboxes.

use std::path::{Path, PathBuf};

use crate::model::attachment::AttachmentPart;

/// Characters that are not allowed in folder or file names on common
/// filesystems.
const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length (in characters) of a thread folder name.
const FOLDER_NAME_MAX: usize = 50;

/// Where one message's attachments ended up.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SavedAttachments {
    /// Message folder, `None` if nothing was written.
    pub dir: Option<PathBuf>,
    pub paths: Vec<PathBuf>,
    /// Bytes written across `paths`.
    pub bytes: u64,
}

/// Persists attachment bytes under a root directory.
#[derive(Debug)]
pub struct AttachmentStore {
    root: PathBuf,
    next_index: usize,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_index: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save the attachments of the next message.
    ///
    /// Must be called once per retrieved message, with or without
    /// attachments, so message folders keep their running index. A file that
    /// cannot be written is logged and skipped.
    pub fn save(&mut self, thread_key: &str, parts: &[AttachmentPart]) -> SavedAttachments {
        let index = self.next_index;
        self.next_index += 1;

        if parts.is_empty() {
            return SavedAttachments::default();
        }

        let dir = self
            .root
            .join(safe_folder_name(thread_key))
            .join(index.to_string());
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to create attachment folder");
            return SavedAttachments::default();
        }

        let mut paths = Vec::with_capacity(parts.len());
        let mut bytes = 0;
        for part in parts {
            match write_part(&dir, part) {
                Ok(path) => {
                    bytes += part.size();
                    paths.push(path);
                }
                Err(e) => {
                    tracing::warn!(
                        filename = %part.filename,
                        error = %e,
                        "Failed to export attachment"
                    );
                }
            }
        }

        SavedAttachments {
            dir: Some(dir),
            paths,
            bytes,
        }
    }
}

fn write_part(dir: &Path, part: &AttachmentPart) -> anyhow::Result<PathBuf> {
    let path = unique_path(&dir.join(sanitize_filename_part(&part.filename, 150)));
    std::fs::write(&path, &part.data)?;
    tracing::debug!(path = %path.display(), size = part.size(), "Saved attachment");
    Ok(path)
}

/// Folder name for a thread: invalid characters replaced by `_`, at most
/// 50 characters.
pub fn safe_folder_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .take(FOLDER_NAME_MAX)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "no-subject".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Sanitize a string for use as a file name: invalid and control
/// characters become `_`, leading dots are dropped, length is capped.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .take(max_len)
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}
