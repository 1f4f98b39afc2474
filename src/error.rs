//! Centralized error types for mailthreader.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailthreader library.
#[derive(Error, Debug)]
pub enum ThreadError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox path does not exist.
    #[error("Mailbox not found: {0}")]
    FileNotFound(PathBuf),

    /// The path exists but is neither an MBOX file nor a directory of `.eml` files.
    #[error("Not a usable mailbox: {0}")]
    InvalidMailbox(PathBuf),

    /// A record handed to the thread engine cannot be identified at all.
    ///
    /// This signals an upstream bug, never an irregular mailbox.
    #[error("Contract violation for record #{position}: {reason}")]
    ContractViolation { position: usize, reason: String },
}

/// Convenience alias for `Result<T, ThreadError>`.
pub type Result<T> = std::result::Result<T, ThreadError>;

impl ThreadError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error` on `path`, turning `NotFound` into [`ThreadError::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::io(path, source)
        }
    }
}

/// Why a `Date:` header could not be turned into a timestamp.
///
/// Never surfaced to callers of the thread engine: both cases order the
/// message at the minimum timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The header was absent or blank.
    #[error("date header is missing")]
    Missing,

    /// None of the known date layouts matched.
    #[error("unrecognized date '{0}'")]
    Unrecognized(String),
}
