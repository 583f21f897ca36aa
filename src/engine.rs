//! The replace-cycle state machine and REPL loop.
//!
//! One cycle walks `ReadOldFragment → Locating → Disambiguating? →
//! ReadNewFragment → SafetyGate → Writing → Validating` and ends in exactly
//! one [`CycleOutcome`]. The engine holds no state across cycles beyond the
//! file set, which is captured once at startup; candidate contents are
//! re-read fresh every scan.
//!
//! All interaction goes through an injected [`InputSource`], so the same
//! machine runs against a terminal or a scripted test harness.

use crate::config::EngineConfig;
use crate::gate::{self, GateVerdict};
use crate::input::InputSource;
use crate::journal::{Journal, JournalEntry};
use crate::lexical::FileKind;
use crate::locate::{self, CandidateMatch, ScanReport};
use crate::notify::{Notifier, NotifyLevel};
use crate::validate::ValidatorRegistry;
use crate::writer::{self, WriteError, WriteOutcome};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::PathBuf;
use thiserror::Error;

/// Whole-input keywords that end the process (case-insensitive after trim).
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "e"];

const AFFIRMATIVE: &str = "yes";

/// Terminal result of one replace cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No file contains the fragment. Reported, not fatal.
    NoMatch,
    /// User-initiated stop at an interactive point.
    Cancelled,
    /// The safety gate refused the replacement; no override exists.
    Blocked(gate::BlockReason),
    /// The write was made, failed validation, and was restored.
    RolledBack(RollbackReason),
    /// The write was made and validated.
    Applied { file: PathBuf, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackReason {
    SyntaxValidationFailed,
}

/// What the REPL loop does after a cycle.
#[derive(Debug)]
pub enum CycleControl {
    Outcome(CycleOutcome),
    /// An exit keyword (or an exhausted input stream) ends the process.
    Exit,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("input error: {0}")]
    Input(#[from] std::io::Error),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub struct Engine<I, N> {
    config: EngineConfig,
    files: Vec<PathBuf>,
    validators: ValidatorRegistry,
    input: I,
    notifier: N,
    journal: Option<Journal>,
}

impl<I: InputSource, N: Notifier> Engine<I, N> {
    pub fn new(
        config: EngineConfig,
        files: Vec<PathBuf>,
        validators: ValidatorRegistry,
        input: I,
        notifier: N,
    ) -> Self {
        Self {
            config,
            files,
            validators,
            input,
            notifier,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Run cycles until an exit signal.
    ///
    /// A failed write aborts its cycle (the target is untouched or already
    /// restored) and the loop continues; an input-stream error ends the run.
    pub fn run(&mut self) -> Result<(), std::io::Error> {
        loop {
            match self.run_cycle() {
                Ok(CycleControl::Exit) => return Ok(()),
                Ok(CycleControl::Outcome(_)) => {}
                Err(EngineError::Input(e)) => return Err(e),
                Err(EngineError::Write(e)) => {
                    eprintln!("{} {}", "cycle aborted:".red(), e);
                }
            }
        }
    }

    /// One full replace cycle.
    pub fn run_cycle(&mut self) -> Result<CycleControl, EngineError> {
        let Some(old) = self.read_fragment("\nPASTE OLD CODE BLOCK:")? else {
            println!("exiting safely");
            return Ok(CycleControl::Exit);
        };

        let report = locate::find_matches(&old, &self.files, &self.config);
        self.report_skips(&report);

        if report.matches.is_empty() {
            println!("{}", "no match found".yellow());
            if let Some(near) = &report.near_miss {
                println!(
                    "{}",
                    format!(
                        "closest block: {}:{} ({:.0}% similar)",
                        near.file.display(),
                        near.line,
                        near.similarity * 100.0
                    )
                    .dimmed()
                );
            }
            return Ok(self.finish(CycleOutcome::NoMatch));
        }

        self.notifier.notify(NotifyLevel::Warning);
        if report.matches.len() > 1 {
            println!(
                "{}",
                format!("block found in {} places", report.matches.len()).yellow()
            );
        } else {
            println!("block found");
        }
        for (i, m) in report.matches.iter().enumerate() {
            println!("{}. {}:{}", i + 1, m.file.display(), m.line);
        }

        let selected = if report.matches.len() == 1 {
            report.matches[0].clone()
        } else {
            match self.disambiguate(&report.matches)? {
                Some(m) => m,
                None => {
                    println!("change cancelled");
                    return Ok(self.finish(CycleOutcome::Cancelled));
                }
            }
        };

        let Some(new) = self.read_fragment("\nPASTE NEW CODE BLOCK:")? else {
            println!("exiting safely");
            return Ok(CycleControl::Exit);
        };

        let kind = FileKind::from_path(&selected.file);
        match gate::evaluate(&selected.text, &new, kind) {
            GateVerdict::Blocked(reason) => {
                self.notifier.notify(NotifyLevel::Alert);
                println!("{} {}", "CHANGE BLOCKED:".red().bold(), reason);
                return Ok(self.finish(CycleOutcome::Blocked(reason)));
            }
            GateVerdict::Warn(reason) => {
                self.notifier.notify(NotifyLevel::Warning);
                println!("{} {}", "WARNING:".yellow().bold(), reason);
                let answer = self.input.read_line("continue? yes or no: ")?;
                let confirmed = answer
                    .as_deref()
                    .map(|a| a.trim().eq_ignore_ascii_case(AFFIRMATIVE))
                    .unwrap_or(false);
                if !confirmed {
                    println!("change cancelled");
                    return Ok(self.finish(CycleOutcome::Cancelled));
                }
            }
            GateVerdict::Pass => {}
        }

        self.preview_diff(&selected.text, &new);

        let validator = self.validators.for_path(&selected.file);
        match writer::commit(&selected.file, &selected.text, &new, validator, &self.config)? {
            WriteOutcome::Applied => {
                self.notifier.notify(NotifyLevel::Success);
                println!(
                    "{} {}:{}",
                    "change applied".green(),
                    selected.file.display(),
                    selected.line
                );
                Ok(self.finish(CycleOutcome::Applied {
                    file: selected.file,
                    line: selected.line,
                }))
            }
            WriteOutcome::RolledBack => {
                self.notifier.notify(NotifyLevel::Alert);
                println!("{}", "SYNTAX CHECK FAILED; rollback complete".red().bold());
                println!(
                    "{}",
                    format!(
                        "backup kept at {}",
                        self.config.backup_path(&selected.file).display()
                    )
                    .dimmed()
                );
                Ok(self.finish(CycleOutcome::RolledBack(
                    RollbackReason::SyntaxValidationFailed,
                )))
            }
        }
    }

    /// Block read with exit-keyword handling. Empty blocks re-prompt; `None`
    /// means the process should end.
    fn read_fragment(&mut self, prompt: &str) -> Result<Option<String>, EngineError> {
        loop {
            let Some(block) = self.input.read_block(prompt)? else {
                return Ok(None);
            };
            let trimmed = block.trim();
            if EXIT_KEYWORDS
                .iter()
                .any(|kw| trimmed.eq_ignore_ascii_case(kw))
            {
                return Ok(None);
            }
            if trimmed.is_empty() {
                println!("{}", "empty block, try again".yellow());
                continue;
            }
            // Drop the newline the end-of-input key appends; the fragment's
            // line span must cover only the pasted lines.
            let block = block
                .strip_suffix("\r\n")
                .or_else(|| block.strip_suffix('\n'))
                .unwrap_or(&block)
                .to_string();
            return Ok(Some(block));
        }
    }

    /// Ask the user to pick one of several matches. Re-prompts indefinitely
    /// on invalid input; `0` or an exhausted stream cancels.
    fn disambiguate(
        &mut self,
        matches: &[CandidateMatch],
    ) -> Result<Option<CandidateMatch>, EngineError> {
        loop {
            let Some(answer) = self
                .input
                .read_line("choose the match number, or 0 to cancel: ")?
            else {
                return Ok(None);
            };
            match answer.trim().parse::<usize>() {
                Ok(0) => return Ok(None),
                Ok(n) if n <= matches.len() => return Ok(Some(matches[n - 1].clone())),
                _ => {
                    println!(
                        "{}",
                        format!("enter a number between 0 and {}", matches.len()).yellow()
                    );
                }
            }
        }
    }

    fn report_skips(&self, report: &ScanReport) {
        for (path, reason) in &report.skipped {
            println!(
                "{}",
                format!("skipped {}: {}", path.display(), reason).dimmed()
            );
        }
    }

    /// Unified diff of the matched block against its replacement, shown
    /// before the write. Display only.
    fn preview_diff(&self, old: &str, new: &str) {
        let diff = TextDiff::from_lines(old, new);
        for change in diff.iter_all_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{}", change).red(),
                ChangeTag::Insert => format!("+{}", change).green(),
                ChangeTag::Equal => format!(" {}", change).normal(),
            };
            print!("{}", line);
            if change.missing_newline() {
                println!();
            }
        }
    }

    fn finish(&self, outcome: CycleOutcome) -> CycleControl {
        if let Some(journal) = &self.journal {
            let (tag, file, line, detail) = match &outcome {
                CycleOutcome::NoMatch => ("no_match", None, None, None),
                CycleOutcome::Cancelled => ("cancelled", None, None, None),
                CycleOutcome::Blocked(reason) => {
                    ("blocked", None, None, Some(reason.to_string()))
                }
                CycleOutcome::RolledBack(_) => {
                    ("rolled_back", None, None, Some("syntax validation failed".to_string()))
                }
                CycleOutcome::Applied { file, line } => {
                    ("applied", Some(file.as_path()), Some(*line), None)
                }
            };
            let entry = JournalEntry {
                timestamp: crate::journal::timestamp_now(),
                outcome: tag,
                file,
                line,
                detail: detail.as_deref(),
            };
            if let Err(e) = journal.record(&entry) {
                eprintln!(
                    "{}",
                    format!("warning: could not write journal entry: {}", e).yellow()
                );
            }
        }
        CycleControl::Outcome(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedSource;
    use crate::locate::collect_files;
    use crate::notify::Silent;
    use std::fs;
    use std::path::Path;

    fn engine_for(
        root: &Path,
        blocks: Vec<&str>,
        lines: Vec<&str>,
    ) -> Engine<ScriptedSource, Silent> {
        let config = EngineConfig::default();
        let files = collect_files(root, &config);
        let validators = ValidatorRegistry::defaults(&config);
        Engine::new(
            config,
            files,
            validators,
            ScriptedSource::new(blocks, lines),
            Silent,
        )
    }

    #[test]
    fn exit_keyword_ends_the_process() {
        let temp = tempfile::tempdir().unwrap();
        let mut engine = engine_for(temp.path(), vec!["  QUIT\n"], vec![]);
        assert!(matches!(engine.run_cycle().unwrap(), CycleControl::Exit));
    }

    #[test]
    fn exhausted_stream_ends_the_process() {
        let temp = tempfile::tempdir().unwrap();
        let mut engine = engine_for(temp.path(), vec![], vec![]);
        assert!(matches!(engine.run_cycle().unwrap(), CycleControl::Exit));
    }

    #[test]
    fn no_match_outcome() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let mut engine = engine_for(temp.path(), vec!["nothing like this\n"], vec![]);
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::NoMatch) => {}
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn empty_block_reprompts_then_proceeds() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        let mut engine = engine_for(temp.path(), vec!["  \n", "no such block\n"], vec![]);
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::NoMatch) => {}
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn disambiguation_zero_cancels() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\ny = 2\nx = 1\n").unwrap();
        let mut engine = engine_for(temp.path(), vec!["x = 1\n"], vec!["0"]);
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn disambiguation_reprompts_on_invalid_input() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\ny = 2\nx = 1\n").unwrap();
        // Garbage, out-of-range, then a cancel.
        let mut engine = engine_for(temp.path(), vec!["x = 1\n"], vec!["abc", "9", "0"]);
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn identifier_drift_blocks_and_leaves_file_alone() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("m.py");
        let content = "def add(a, b):\n    return a + b\n";
        fs::write(&target, content).unwrap();

        let mut engine = engine_for(
            temp.path(),
            vec![
                "def add(a, b):\n    return a + b\n",
                "def add(x, y):\n    return x - y\n",
            ],
            vec![],
        );
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::Blocked(_)) => {}
            other => panic!("expected Blocked, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&target).unwrap(), content);
    }

    #[test]
    fn declined_override_cancels_without_change() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("m.py");
        let content = "import os\nimport re\nx = os.sep + re.escape(\"a\")\n";
        fs::write(&target, content).unwrap();

        let mut engine = engine_for(
            temp.path(),
            vec![
                "import os\nimport re\nx = os.sep + re.escape(\"a\")\n",
                "import os\nre = os\nx = os.sep + re.escape(\"a\")\n",
            ],
            vec!["no"],
        );
        match engine.run_cycle().unwrap() {
            CycleControl::Outcome(CycleOutcome::Cancelled) => {}
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&target).unwrap(), content);
    }
}
