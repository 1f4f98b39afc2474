//! End-to-end tests: mailbox fixtures → records → threads → files on disk.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use predicates::prelude::*;

use mailthreader::export::{self, attachment::AttachmentStore, ExportFormat};
use mailthreader::model::record::MessageKind;
use mailthreader::pipeline::{collect_records, Retrieval};
use mailthreader::source::{open_source, MailboxSource, SubjectFilter};
use mailthreader::thread::assemble;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn sources() -> Vec<Box<dyn MailboxSource>> {
    vec![
        open_source(&fixture("INBOX.mbox"), 1024 * 1024).unwrap(),
        open_source(&fixture("Sent"), 1024 * 1024).unwrap(),
    ]
}

fn retrieve(subject: &str, store: Option<&mut AttachmentStore>) -> Retrieval {
    collect_records(&sources(), &SubjectFilter::new(subject), store, None).unwrap()
}

// ─── Retrieval ──────────────────────────────────────────────────────

#[test]
fn test_retrieval_filters_by_subject() {
    let retrieval = retrieve("project update", None);
    assert_eq!(retrieval.scanned, 6, "4 MBOX messages + 2 .eml files");

    let ids: Vec<&str> = retrieval.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "<pu-1@example.com>",
            "<pu-3@example.com>",
            "<pu-4@example.com>",
            "<pu-2@example.com>",
        ]
    );
    assert_eq!(retrieval.records[3].mailbox, "Sent");
    assert_eq!(retrieval.records[1].kind, MessageKind::Reply);
    assert_eq!(retrieval.records[0].from, "Alice Martin <alice@example.com>");
    assert!(retrieval.records[0].body.contains("plan for Q1"));
}

#[test]
fn test_empty_filter_retrieves_everything() {
    let retrieval = retrieve("", None);
    assert_eq!(retrieval.records.len(), 6);
    assert!(retrieval.records.iter().all(|r| r.attachment_paths.is_empty()));
}

// ─── Threading across mailboxes ─────────────────────────────────────

#[test]
fn test_threads_span_mailboxes() {
    let retrieval = retrieve("Project Update", None);
    let conversations = assemble(&retrieval.records).unwrap();

    assert_eq!(conversations.len(), 1);
    let conv = &conversations[0];
    assert_eq!(conv.thread_key, "Project Update");
    assert_eq!(conv.chains.len(), 2);

    let first: Vec<&str> = conv.chains[0].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        first,
        ["<pu-1@example.com>", "<pu-2@example.com>", "<pu-3@example.com>"]
    );
    assert_eq!(conv.chains[1][0].id, "<pu-4@example.com>");
}

// ─── Attachments ────────────────────────────────────────────────────

#[test]
fn test_attachments_written_per_message() {
    let temp = assert_fs::TempDir::new().unwrap();
    let mut store = AttachmentStore::new(temp.child("attachments").path());
    let retrieval = retrieve("project update", Some(&mut store));

    assert_eq!(retrieval.attachments_saved, 1);
    assert_eq!(retrieval.attachment_bytes, 8);

    let saved = temp.child("attachments/Project Update/0/plan.txt");
    saved.assert(predicate::path::is_file());
    saved.assert("plan v1\n");

    let root = &retrieval.records[0];
    assert_eq!(root.attachment_paths, vec![saved.path().to_path_buf()]);
    assert_eq!(
        root.attachment_dir.as_deref(),
        Some(temp.child("attachments/Project Update/0").path())
    );
    assert!(retrieval.records[1].attachment_dir.is_none());

    temp.close().unwrap();
}

// ─── Exports ────────────────────────────────────────────────────────

#[test]
fn test_json_export() {
    let temp = assert_fs::TempDir::new().unwrap();
    let retrieval = retrieve("project update", None);
    let conversations = assemble(&retrieval.records).unwrap();

    let out = temp.child("threaded_emails.json");
    export::export_threads(&conversations, ExportFormat::Json, out.path(), ',').unwrap();

    out.assert(predicate::path::is_file());
    out.assert(predicate::str::contains("\"thread\": \"Project Update\""));
    out.assert(predicate::str::contains("\"type\": \"new-mail\""));

    let text = std::fs::read_to_string(out.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let chains = value[0]["chains"].as_array().unwrap();
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0]["messages"].as_array().unwrap().len(), 3);
    assert_eq!(chains[0]["messages"][1]["mailbox"], "Sent");

    temp.close().unwrap();
}

#[test]
fn test_csv_exports() {
    let temp = assert_fs::TempDir::new().unwrap();
    let retrieval = retrieve("project update", None);
    let conversations = assemble(&retrieval.records).unwrap();

    let threads = temp.child("threads.csv");
    export::export_threads(&conversations, ExportFormat::Csv, threads.path(), ',').unwrap();
    threads.assert(predicate::str::starts_with("\u{feff}Thread,Chain,Mailbox,Type"));
    threads.assert(predicate::str::contains("Project Update,2,INBOX,new,Project Update"));

    let flat = temp.child("emails.csv");
    export::csv::export_flat_csv(&retrieval.records, flat.path(), ';').unwrap();
    flat.assert(predicate::str::contains("Mailbox;Subject;From;To;Date;Body;Attachments"));
    flat.assert(predicate::str::contains("Sent;Re: Project Update;"));

    temp.close().unwrap();
}

// ─── Mailboxes sharing a name ───────────────────────────────────────

#[test]
fn test_same_named_mailboxes_keep_distinct_keys() {
    let temp = assert_fs::TempDir::new().unwrap();
    let message = "From x@example.com Mon Jan 06 09:00:00 2025\n\
                   Subject: Status\n\
                   \n\
                   No Message-ID here.\n";
    temp.child("a").create_dir_all().unwrap();
    temp.child("b").create_dir_all().unwrap();
    temp.child("a/INBOX.mbox").write_str(message).unwrap();
    temp.child("b/INBOX.mbox").write_str(message).unwrap();

    let sources = vec![
        open_source(temp.child("a/INBOX.mbox").path(), 1024 * 1024).unwrap(),
        open_source(temp.child("b/INBOX.mbox").path(), 1024 * 1024).unwrap(),
    ];
    let retrieval = collect_records(&sources, &SubjectFilter::default(), None, None).unwrap();

    let labels: Vec<&str> = retrieval.records.iter().map(|r| r.mailbox.as_str()).collect();
    assert_eq!(labels, ["INBOX", "INBOX#2"]);
    let keys: Vec<String> = retrieval.records.iter().map(|r| r.key()).collect();
    assert_ne!(keys[0], keys[1]);

    let conversations = assemble(&retrieval.records).unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].chains.len(), 2);

    temp.close().unwrap();
}
