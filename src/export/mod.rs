//! Export functionality: JSON and CSV documents, and attachment files.

pub mod attachment;
pub mod csv;
pub mod json;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::thread::Conversation;

/// Output format for assembled threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Write conversations to `output_path` in the requested format.
pub fn export_threads(
    conversations: &[Conversation<'_>],
    format: ExportFormat,
    output_path: &Path,
    csv_separator: char,
) -> anyhow::Result<()> {
    match format {
        ExportFormat::Json => json::export_json(conversations, output_path),
        ExportFormat::Csv => csv::export_threads_csv(conversations, output_path, csv_separator),
    }
}
