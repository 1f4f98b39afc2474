//! Export threads and flat message lists to CSV.
//!
//! Output is UTF-8 with BOM for Excel compatibility.

use std::io::Write;
use std::path::Path;

use crate::model::record::MessageRecord;
use crate::thread::Conversation;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

const THREAD_COLUMNS: [&str; 12] = [
    "Thread",
    "Chain",
    "Mailbox",
    "Type",
    "Subject",
    "From",
    "To",
    "Date",
    "Body",
    "Attachments",
    "Message_ID",
    "Reply_To",
];

const FLAT_COLUMNS: [&str; 7] = [
    "Mailbox",
    "Subject",
    "From",
    "To",
    "Date",
    "Body",
    "Attachments",
];

/// Write one row per message, grouped by thread and chain.
///
/// `Chain` is the 1-based chain number within its thread.
pub fn write_threads<W: Write>(
    out: &mut W,
    conversations: &[Conversation<'_>],
    separator: char,
) -> std::io::Result<()> {
    out.write_all(&UTF8_BOM)?;
    write_row(out, THREAD_COLUMNS.iter().copied(), separator)?;

    for conv in conversations {
        for (chain_no, chain) in conv.chains.iter().enumerate() {
            let chain_no = (chain_no + 1).to_string();
            for record in chain {
                let attachments = attachment_names(record);
                let reply_to = record.reply_target.as_deref().unwrap_or("");
                write_row(
                    out,
                    [
                        conv.thread_key.as_str(),
                        &chain_no,
                        &record.mailbox,
                        record.kind.as_str(),
                        &record.subject_raw,
                        &record.from,
                        &record.to,
                        &record.date,
                        &record.body,
                        &attachments,
                        &record.id,
                        reply_to,
                    ],
                    separator,
                )?;
            }
        }
    }
    Ok(())
}

/// Write one row per record in the given order, without threading.
pub fn write_flat<W: Write>(
    out: &mut W,
    records: &[MessageRecord],
    separator: char,
) -> std::io::Result<()> {
    out.write_all(&UTF8_BOM)?;
    write_row(out, FLAT_COLUMNS.iter().copied(), separator)?;

    for record in records {
        let attachments = attachment_names(record);
        write_row(
            out,
            [
                record.mailbox.as_str(),
                &record.subject_raw,
                &record.from,
                &record.to,
                &record.date,
                &record.body,
                &attachments,
            ],
            separator,
        )?;
    }
    Ok(())
}

/// Export assembled threads to a CSV file.
pub fn export_threads_csv(
    conversations: &[Conversation<'_>],
    output_path: &Path,
    separator: char,
) -> anyhow::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    write_threads(&mut file, conversations, separator)?;
    file.flush()?;
    tracing::info!(path = %output_path.display(), threads = conversations.len(), "Exported threads as CSV");
    Ok(())
}

/// Export records to a CSV file in retrieval order.
pub fn export_flat_csv(
    records: &[MessageRecord],
    output_path: &Path,
    separator: char,
) -> anyhow::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    write_flat(&mut file, records, separator)?;
    file.flush()?;
    tracing::info!(path = %output_path.display(), messages = records.len(), "Exported messages as CSV");
    Ok(())
}

fn write_row<'a, W: Write>(
    out: &mut W,
    fields: impl IntoIterator<Item = &'a str>,
    separator: char,
) -> std::io::Result<()> {
    let sep = separator.to_string();
    let row = fields
        .into_iter()
        .map(|f| csv_escape(f, separator))
        .collect::<Vec<_>>()
        .join(&sep);
    out.write_all(row.as_bytes())?;
    out.write_all(b"\r\n")
}

/// Attachment file names, comma separated.
fn attachment_names(record: &MessageRecord) -> String {
    record
        .attachment_paths
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains the separator, quotes, or
/// line breaks.
fn csv_escape(value: &str, separator: char) -> String {
    if value.contains(separator) || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
