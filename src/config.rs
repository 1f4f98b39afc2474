//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILTHREADER_CONFIG` (environment variable)
//! 2. `~/.config/mailthreader/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailthreader\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override every value read here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;
use crate::source::mbox::DEFAULT_MAX_MESSAGE_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Which mailboxes to read and what to keep.
    pub fetch: FetchConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Mailboxes read when none are given on the command line, in order.
    pub mailboxes: Vec<PathBuf>,
    /// Subject search used when `--subject` and `$MAILTHREADER_SUBJECT` are
    /// both absent.
    pub subject_filter: Option<String>,
    /// Maximum message size in bytes (default: 268435456 = 256 MB).
    pub max_message_size: usize,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output format for `thread`.
    pub format: ExportFormat,
    /// Default output file; `threaded_emails.<ext>` when unset.
    pub output: Option<PathBuf>,
    /// Root directory for saved attachments.
    pub attachments_dir: PathBuf,
    /// Write attachments to disk.
    pub save_attachments: bool,
    /// CSV field separator character.
    pub csv_separator: char,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mailboxes: Vec::new(),
            subject_filter: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            output: None,
            attachments_dir: PathBuf::from("attachments"),
            save_attachments: true,
            csv_separator: ',',
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from a specific file, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILTHREADER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailthreader").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailthreader")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailthreader.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.export.format, ExportFormat::Json);
        assert_eq!(cfg.export.csv_separator, ',');
        assert!(cfg.export.save_attachments);
        assert_eq!(cfg.fetch.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert!(cfg.fetch.mailboxes.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[fetch]
mailboxes = ["mail/INBOX.mbox", "mail/Sent"]
subject_filter = "Project Update"

[export]
format = "csv"
csv_separator = ";"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(
            cfg.fetch.mailboxes,
            vec![PathBuf::from("mail/INBOX.mbox"), PathBuf::from("mail/Sent")]
        );
        assert_eq!(cfg.fetch.subject_filter.as_deref(), Some("Project Update"));
        assert_eq!(cfg.export.format, ExportFormat::Csv);
        assert_eq!(cfg.export.csv_separator, ';');
        // Other fields use defaults
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.export.attachments_dir, PathBuf::from("attachments"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").unwrap();
        assert_eq!(load_config_from(&path).general.log_level, "debug");
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general\nlog_level = ").unwrap();
        assert_eq!(load_config_from(&path).general.log_level, "warn");
    }

    #[test]
    fn test_log_file_in_cache_dir() {
        let cfg = Config {
            general: GeneralConfig {
                cache_dir: Some(PathBuf::from("/tmp/mt-cache")),
                ..GeneralConfig::default()
            },
            ..Config::default()
        };
        assert_eq!(log_file_path(&cfg), PathBuf::from("/tmp/mt-cache/mailthreader.log"));
    }
}
