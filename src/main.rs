//! CLI entry point for `mailthreader`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailthreader::config::{self, Config};
use mailthreader::export::{self, attachment::AttachmentStore, ExportFormat};
use mailthreader::pipeline::{self, Retrieval};
use mailthreader::source::{self, MailboxSource, SubjectFilter};
use mailthreader::thread;

#[derive(Parser)]
#[command(
    name = "mailthreader",
    version,
    about = "Rebuild email conversations from MBOX files and .eml folders"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve matching messages and export them as threads
    Thread {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file (default: threaded_emails.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Retrieve matching messages and write them to CSV without threading
    Extract {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Output CSV file (default: emails.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Options shared by the retrieving commands.
#[derive(Args)]
struct FetchArgs {
    /// MBOX files or .eml directories, read in the given order
    #[arg(value_name = "MAILBOX")]
    mailboxes: Vec<PathBuf>,

    /// Case-insensitive subject search (prompted for when not set anywhere)
    #[arg(short, long, env = "MAILTHREADER_SUBJECT")]
    subject: Option<String>,

    /// Directory to save attachments under
    #[arg(long, value_name = "DIR")]
    attachments: Option<PathBuf>,

    /// Do not write attachments to disk
    #[arg(long, conflicts_with = "attachments")]
    no_attachments: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Thread {
            fetch,
            format,
            output,
        } => cmd_thread(&fetch, format, output, &config),
        Commands::Extract { fetch, output } => cmd_extract(&fetch, output, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = config::cache_dir(config);
    let log_name = log_path
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "mailthreader.log".into());

    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailthreader", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Retrieve, thread and export.
fn cmd_thread(
    fetch: &FetchArgs,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let retrieval = retrieve(fetch, config)?;

    let conversations = thread::assemble(&retrieval.records)?;

    let format = format.unwrap_or(config.export.format);
    let output = output
        .or_else(|| config.export.output.clone())
        .unwrap_or_else(|| PathBuf::from(format!("threaded_emails.{}", format.extension())));
    ensure_parent_dir(&output)?;
    export::export_threads(&conversations, format, &output, config.export.csv_separator)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let chains: usize = conversations.iter().map(|c| c.chains.len()).sum();
    println!();
    println!("  {:<25} {}", "Messages read", retrieval.scanned);
    println!("  {:<25} {}", "Messages matched", retrieval.records.len());
    println!("  {:<25} {}", "Threads", conversations.len());
    println!("  {:<25} {}", "Chains", chains);
    print_attachment_summary(&retrieval);
    println!("  {:<25} {}", "Output file", output.display());
    println!("  {:<25} {:.2?}", "Elapsed", start.elapsed());
    println!();

    Ok(())
}

/// Retrieve and write a flat CSV in retrieval order.
fn cmd_extract(fetch: &FetchArgs, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let retrieval = retrieve(fetch, config)?;

    let output = output.unwrap_or_else(|| PathBuf::from("emails.csv"));
    ensure_parent_dir(&output)?;
    export::csv::export_flat_csv(&retrieval.records, &output, config.export.csv_separator)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!();
    println!("  {:<25} {}", "Messages read", retrieval.scanned);
    println!("  {:<25} {}", "Messages extracted", retrieval.records.len());
    print_attachment_summary(&retrieval);
    println!("  {:<25} {}", "Output file", output.display());
    println!();

    Ok(())
}

/// Open the mailboxes, resolve the subject search and run the pipeline.
fn retrieve(fetch: &FetchArgs, config: &Config) -> anyhow::Result<Retrieval> {
    let paths = if fetch.mailboxes.is_empty() {
        config.fetch.mailboxes.clone()
    } else {
        fetch.mailboxes.clone()
    };
    if paths.is_empty() {
        anyhow::bail!("No mailbox given. Pass MBOX files or .eml directories, or set [fetch] mailboxes in the config file");
    }

    let sources = paths
        .iter()
        .map(|p| {
            source::open_source(p, config.fetch.max_message_size)
                .with_context(|| format!("Cannot open mailbox {}", p.display()))
        })
        .collect::<anyhow::Result<Vec<Box<dyn MailboxSource>>>>()?;

    let subject = resolve_subject(fetch.subject.as_deref(), config)?;
    let filter = SubjectFilter::new(&subject);
    if filter.is_empty() {
        tracing::warn!("Empty subject search, every message will be retrieved");
    }

    let mut store = attachment_store(fetch, config);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} Reading {msg} ({pos} messages)")?);
    let on_progress = |label: &str, scanned: u64| {
        pb.set_message(label.to_string());
        pb.set_position(scanned);
    };

    let retrieval = pipeline::collect_records(&sources, &filter, store.as_mut(), Some(&on_progress))?;
    pb.finish_and_clear();

    if retrieval.records.is_empty() {
        println!("  No messages found with subject containing '{subject}'.");
    }
    Ok(retrieval)
}

/// Subject search from, in order: the flag or `$MAILTHREADER_SUBJECT`, the
/// config file, an interactive prompt.
fn resolve_subject(flag: Option<&str>, config: &Config) -> anyhow::Result<String> {
    if let Some(subject) = flag.or(config.fetch.subject_filter.as_deref()) {
        return Ok(subject.to_string());
    }
    prompt_subject()
}

fn prompt_subject() -> anyhow::Result<String> {
    use std::io::{BufRead, Write};

    let mut stderr = std::io::stderr();
    write!(stderr, "Enter the subject to search for: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn attachment_store(fetch: &FetchArgs, config: &Config) -> Option<AttachmentStore> {
    if fetch.no_attachments {
        return None;
    }
    match &fetch.attachments {
        Some(dir) => Some(AttachmentStore::new(dir)),
        None if config.export.save_attachments => {
            Some(AttachmentStore::new(&config.export.attachments_dir))
        }
        None => None,
    }
}

fn print_attachment_summary(retrieval: &Retrieval) {
    use humansize::{format_size, BINARY};

    if retrieval.attachments_saved > 0 {
        println!(
            "  {:<25} {} ({})",
            "Attachments saved",
            retrieval.attachments_saved,
            format_size(retrieval.attachment_bytes, BINARY)
        );
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {}", parent.display()))?;
    }
    Ok(())
}
