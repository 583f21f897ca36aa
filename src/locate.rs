//! Block location: file-set collection and window scanning.
//!
//! The locator compares every N-line window of every candidate file against
//! the normalized search fragment. Matching is case-sensitive and
//! whitespace-insensitive; only whole-line windows are considered. Files the
//! scan cannot use are excluded with an explicit [`SkipReason`] rather than
//! silently swallowed.

use crate::config::EngineConfig;
use crate::normalize::{line_span, normalize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// A located, raw occurrence of the search fragment.
///
/// Invariant: `normalize(text)` equals the normalized search fragment, and
/// `text` is an exact substring of the file's content at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub file: PathBuf,
    /// 1-based line number of the window's first line.
    pub line: usize,
    /// The raw (non-normalized) matched text, used for substitution.
    pub text: String,
}

/// Why a file was excluded from a scan. Skips are outcomes, not errors.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("larger than the {limit}-byte scan limit ({size} bytes)")]
    TooLarge { size: u64, limit: u64 },

    #[error("not valid UTF-8")]
    NotUtf8,

    #[error("unreadable: {0}")]
    Io(std::io::Error),
}

/// The closest non-matching window seen during a scan that found nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    pub file: PathBuf,
    pub line: usize,
    /// Normalized Levenshtein similarity in [0, 1].
    pub similarity: f64,
}

/// Everything a scan produced: matches, per-file skips, and a best-effort
/// near-miss hint.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub matches: Vec<CandidateMatch>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub near_miss: Option<NearMiss>,
}

/// Enumerate candidate files under `root`, pruning ignored directories and
/// keeping only recognized extensions. Captured once at engine startup; file
/// contents are re-read fresh at each scan.
pub fn collect_files(root: &Path, config: &EngineConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                !config.ignore_dirs.iter().any(|d| d == name.as_ref())
            } else {
                true
            }
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| config.recognizes(path))
        .collect();
    files.sort();
    files
}

/// Scan the file set for every window whose normalized text equals the
/// normalized fragment.
pub fn find_matches(fragment: &str, files: &[PathBuf], config: &EngineConfig) -> ScanReport {
    let wanted = normalize(fragment);
    let span = line_span(fragment);
    let mut report = ScanReport::default();

    for file in files {
        let text = match read_candidate(file, config) {
            Ok(text) => text,
            Err(reason) => {
                report.skipped.push((file.clone(), reason));
                continue;
            }
        };
        scan_file(file, &text, &wanted, span, config, &mut report);
    }

    if !report.matches.is_empty() {
        report.near_miss = None;
    }
    report
}

fn read_candidate(file: &Path, config: &EngineConfig) -> Result<String, SkipReason> {
    let size = fs::metadata(file).map_err(SkipReason::Io)?.len();
    if size > config.max_file_bytes {
        return Err(SkipReason::TooLarge {
            size,
            limit: config.max_file_bytes,
        });
    }
    let bytes = fs::read(file).map_err(SkipReason::Io)?;
    String::from_utf8(bytes).map_err(|_| SkipReason::NotUtf8)
}

fn scan_file(
    file: &Path,
    text: &str,
    wanted: &str,
    span: usize,
    config: &EngineConfig,
    report: &mut ScanReport,
) {
    // Split on '\n' only so a re-joined window is an exact substring of the
    // file content, CRLF endings included.
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < span {
        return;
    }

    for start in 0..=(lines.len() - span) {
        let window = lines[start..start + span].join("\n");
        let window_norm = normalize(&window);
        if window_norm == wanted {
            report.matches.push(CandidateMatch {
                file: file.to_path_buf(),
                line: start + 1,
                text: window,
            });
        } else {
            consider_near_miss(file, start + 1, &window_norm, wanted, config, report);
        }
    }
}

fn consider_near_miss(
    file: &Path,
    line: usize,
    window_norm: &str,
    wanted: &str,
    config: &EngineConfig,
    report: &mut ScanReport,
) {
    if wanted.is_empty() || window_norm.is_empty() {
        return;
    }
    // Cheap length gate before paying for an edit distance.
    let len_gap = window_norm.len().abs_diff(wanted.len());
    if len_gap * 10 > wanted.len() * 3 {
        return;
    }
    let similarity = strsim::normalized_levenshtein(window_norm, wanted);
    if similarity < config.near_miss_threshold {
        return;
    }
    let better = report
        .near_miss
        .as_ref()
        .is_none_or(|best| similarity > best.similarity);
    if better {
        report.near_miss = Some(NearMiss {
            file: file.to_path_buf(),
            line,
            similarity,
        });
    }
}
