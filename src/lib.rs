//! `mailthreader`: rebuild email conversations from local mailboxes.
//!
//! This crate reads MBOX files and `.eml` directories, keeps the messages
//! whose subject matches a search, decodes them, saves their attachments,
//! and reassembles them into chronologically ordered reply chains grouped by
//! normalized subject.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod thread;
