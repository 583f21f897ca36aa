//! Append-only session journal.
//!
//! One JSON object per line for every terminal cycle outcome, so a session's
//! effects can be audited after the fact. Journal failures are reported to
//! the caller but never fail a cycle that already committed.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct JournalEntry<'a> {
    pub timestamp: String,
    /// Stable outcome tag: `applied`, `rolled_back`, `blocked`, `cancelled`,
    /// `no_match`.
    pub outcome: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'a str>,
}

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn record(&self, entry: &JournalEntry<'_>) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// RFC 3339 timestamp for journal entries; falls back to the raw unix
/// seconds if formatting fails.
pub fn timestamp_now() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
