//! Transactional file rewrite: backup, substitute, validate, roll back.
//!
//! Ordering guarantees: the backup is written strictly before any mutation,
//! the mutation strictly before validation, and a rollback strictly before
//! the outcome is reported. A target file is only ever observable as fully
//! original or fully updated-and-validated.

use crate::config::EngineConfig;
use crate::validate::SyntaxValidator;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("matched text no longer occurs in {file} (changed since the scan)")]
    StaleTarget { file: PathBuf },

    #[error("backup at {backup} no longer matches the content it was taken from")]
    BackupCorrupted { backup: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl WriteError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Terminal result of a commit: either the new state was validated, or the
/// original bytes were restored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a commit outcome decides what the cycle reports"]
pub enum WriteOutcome {
    Applied,
    RolledBack,
}

/// Pre-mutation byte copy of a target file.
///
/// Stored adjacent to the original under the configured suffix, overwritten
/// by the next backup of the same file, and never deleted by the engine; the
/// artifact is left for caller recovery. The content hash taken at creation
/// is re-verified before a restore.
#[derive(Debug)]
pub struct Backup {
    source: PathBuf,
    path: PathBuf,
    hash: u64,
}

impl Backup {
    /// Copy the file's current on-disk bytes to the backup path.
    ///
    /// Fail-closed: any error here must abort the cycle before mutation.
    pub fn create(file: &Path, config: &EngineConfig) -> Result<Self, WriteError> {
        let bytes = fs::read(file).map_err(|e| WriteError::io(file, e))?;
        let path = config.backup_path(file);
        fs::write(&path, &bytes).map_err(|e| WriteError::io(&path, e))?;
        Ok(Self {
            source: file.to_path_buf(),
            path,
            hash: xxh3_64(&bytes),
        })
    }

    /// Restore the original bytes over the target file.
    ///
    /// The backup artifact is re-read and hash-checked first; a corrupted
    /// backup fails the restore rather than writing untrusted bytes.
    pub fn restore(&self) -> Result<(), WriteError> {
        let bytes = fs::read(&self.path).map_err(|e| WriteError::io(&self.path, e))?;
        if xxh3_64(&bytes) != self.hash {
            return Err(WriteError::BackupCorrupted {
                backup: self.path.clone(),
            });
        }
        atomic_write(&self.source, &bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run one guarded rewrite of `file`.
///
/// Substitutes the first literal occurrence of `matched_text` (the exact raw
/// text the locator extracted, not its normalized form) with `new_text`,
/// persists atomically, and consults `validator` on the post-write state.
/// Validation failure restores the pre-attempt bytes and reports
/// [`WriteOutcome::RolledBack`].
pub fn commit(
    file: &Path,
    matched_text: &str,
    new_text: &str,
    validator: Option<&dyn SyntaxValidator>,
    config: &EngineConfig,
) -> Result<WriteOutcome, WriteError> {
    // Fresh read; the scan's view of the file may be stale.
    let original = fs::read_to_string(file).map_err(|e| WriteError::io(file, e))?;
    if !original.contains(matched_text) {
        return Err(WriteError::StaleTarget {
            file: file.to_path_buf(),
        });
    }

    let backup = Backup::create(file, config)?;

    // First literal occurrence, whole-file scope. When two byte-identical
    // occurrences exist this can rewrite a different one than the user
    // selected; known carried-over behavior.
    let updated = original.replacen(matched_text, new_text, 1);
    atomic_write(file, updated.as_bytes())?;

    // Bump mtime so external watchers notice the rewrite.
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(file, now).map_err(|e| WriteError::io(file, e))?;

    let valid = validator.map_or(true, |v| v.validate(file, &updated));
    if !valid {
        backup.restore()?;
        return Ok(WriteOutcome::RolledBack);
    }

    Ok(WriteOutcome::Applied)
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = match parent {
        Some(parent) => parent,
        None => Path::new("."),
    };

    let run = || -> std::io::Result<()> {
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };
    run().map_err(|e| WriteError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Always(bool);

    impl SyntaxValidator for Always {
        fn validate(&self, _path: &Path, _content: &str) -> bool {
            self.0
        }
    }

    fn fixture(content: &str) -> (tempfile::TempDir, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("target.py");
        fs::write(&file, content).unwrap();
        (temp, file)
    }

    #[test]
    fn applied_replaces_first_occurrence_only() {
        let (_temp, file) = fixture("a = 1\nb = a\na = 1\n");
        let config = EngineConfig::default();

        let outcome = commit(&file, "a = 1", "a = 2", Some(&Always(true)), &config).unwrap();
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(fs::read_to_string(&file).unwrap(), "a = 2\nb = a\na = 1\n");
    }

    #[test]
    fn backup_is_written_and_left_behind() {
        let (_temp, file) = fixture("x = 1\n");
        let config = EngineConfig::default();

        commit(&file, "x = 1", "x = 2", Some(&Always(true)), &config).unwrap();
        let backup = config.backup_path(&file);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "x = 1\n");
    }

    #[test]
    fn rollback_restores_exact_bytes() {
        let content = "def f():\n    pass\n# trailing\n";
        let (_temp, file) = fixture(content);
        let config = EngineConfig::default();

        let outcome = commit(&file, "pass", "broken(", Some(&Always(false)), &config).unwrap();
        assert_eq!(outcome, WriteOutcome::RolledBack);
        assert_eq!(fs::read(&file).unwrap(), content.as_bytes());
    }

    #[test]
    fn stale_target_aborts_before_mutation() {
        let (_temp, file) = fixture("y = 1\n");
        let config = EngineConfig::default();

        let err = commit(&file, "never there", "z", Some(&Always(true)), &config).unwrap_err();
        assert!(matches!(err, WriteError::StaleTarget { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "y = 1\n");
        assert!(!config.backup_path(&file).exists());
    }

    #[test]
    fn missing_validator_registration_applies_without_check() {
        let (_temp, file) = fixture("x = 1\n");
        let config = EngineConfig::default();

        let outcome = commit(&file, "x = 1", "x = 2", None, &config).unwrap();
        assert_eq!(outcome, WriteOutcome::Applied);
    }

    #[test]
    fn next_backup_overwrites_the_previous_one() {
        let (_temp, file) = fixture("x = 1\n");
        let config = EngineConfig::default();

        commit(&file, "x = 1", "x = 2", Some(&Always(true)), &config).unwrap();
        commit(&file, "x = 2", "x = 3", Some(&Always(true)), &config).unwrap();
        let backup = config.backup_path(&file);
        assert_eq!(fs::read_to_string(&backup).unwrap(), "x = 2\n");
    }

    #[test]
    fn corrupted_backup_refuses_to_restore() {
        let (_temp, file) = fixture("x = 1\n");
        let config = EngineConfig::default();

        let backup = Backup::create(&file, &config).unwrap();
        fs::write(backup.path(), "tampered").unwrap();
        let err = backup.restore().unwrap_err();
        assert!(matches!(err, WriteError::BackupCorrupted { .. }));
        // Target untouched by the failed restore.
        assert_eq!(fs::read_to_string(&file).unwrap(), "x = 1\n");
    }
}
