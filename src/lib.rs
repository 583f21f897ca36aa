//! Patchguard: guarded block replacement for source trees.
//!
//! Given an old code fragment and a new one, the engine locates the fragment
//! inside a codebase, disambiguates among multiple occurrences, enforces
//! lexical safety invariants, and performs a transactional file rewrite that
//! is syntax-validated and rolled back on failure.
//!
//! # Architecture
//!
//! Matching is whitespace-insensitive and purely textual: a fragment matches
//! any whole-line window whose [`normalize`]d form equals the fragment's.
//! The substitution always uses the raw matched text, so untouched parts of
//! the file stay byte-identical.
//!
//! # Safety
//!
//! - Identifier-set drift between old and new fragments blocks the write
//!   outright; a reduced import count requires explicit confirmation
//! - A byte-for-byte backup strictly precedes every mutation
//! - Writes are atomic (tempfile + fsync + rename)
//! - The post-write state is syntax-validated per language family and the
//!   backup is restored on failure
//!
//! A file is only ever observable as fully original or fully
//! updated-and-validated.
//!
//! [`normalize`]: normalize::normalize

pub mod config;
pub mod engine;
pub mod gate;
pub mod input;
pub mod journal;
pub mod lexical;
pub mod locate;
pub mod normalize;
pub mod notify;
pub mod validate;
pub mod writer;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, EngineConfig};
pub use engine::{CycleControl, CycleOutcome, Engine, EngineError, RollbackReason};
pub use gate::{evaluate, BlockReason, GateVerdict, WarnReason};
pub use input::{InputSource, ScriptedSource, StdinSource};
pub use journal::{Journal, JournalEntry};
pub use lexical::{count_imports, extract_identifiers, FileKind};
pub use locate::{collect_files, find_matches, CandidateMatch, NearMiss, ScanReport, SkipReason};
pub use normalize::normalize;
pub use notify::{Notifier, NotifyLevel, Silent, TerminalBell};
pub use validate::{ExternalCheckValidator, PythonValidator, SyntaxValidator, ValidatorRegistry};
pub use writer::{commit, Backup, WriteError, WriteOutcome};
