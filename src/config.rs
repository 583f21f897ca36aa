//! Engine configuration.
//!
//! The original tool kept extensions and ignore lists in process-global
//! mutable state; here everything is an immutable [`EngineConfig`] handed to
//! the engine at construction. A config can be loaded from a TOML file, with
//! every field optional and defaulted.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Immutable configuration consumed by the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Recognized source-file extensions (lowercase, no leading dot).
    pub extensions: Vec<String>,
    /// Directory names pruned from the scan.
    pub ignore_dirs: Vec<String>,
    /// Suffix appended to a file name to form its backup path.
    pub backup_suffix: String,
    /// Files larger than this are skipped during scanning.
    pub max_file_bytes: u64,
    /// External syntax-check command for the ECMA family; the target path is
    /// appended as the final argument.
    pub check_command: Vec<String>,
    /// Bound on an external check invocation, in seconds. `None` waits
    /// indefinitely; the value is policy, no default bound is assumed.
    pub validator_timeout_secs: Option<u64>,
    /// Minimum normalized similarity for a near-miss hint on a failed scan.
    pub near_miss_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extensions: ["py", "js", "ejs", "ts", "jsx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_dirs: ["node_modules", ".git", "__pycache__", ".vscode", "dist", "build"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            backup_suffix: "bak".to_string(),
            max_file_bytes: 1_000_000,
            check_command: vec!["node".to_string(), "--check".to_string()],
            validator_timeout_secs: None,
            near_miss_threshold: 0.85,
        }
    }
}

impl EngineConfig {
    /// True if the path's extension is one the engine scans.
    pub fn recognizes(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions.iter().any(|known| known == &e))
    }

    /// Backup path for a target file: `<filename>.<suffix>` adjacent to it.
    pub fn backup_path(&self, file: &Path) -> PathBuf {
        let mut name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push('.');
        name.push_str(&self.backup_suffix);
        file.with_file_name(name)
    }

    fn validate(&self) -> Result<(), String> {
        if self.extensions.is_empty() {
            return Err("extensions must not be empty".to_string());
        }
        if self.backup_suffix.trim().is_empty() {
            return Err("backup_suffix must not be empty".to_string());
        }
        if self.check_command.is_empty() {
            return Err("check_command must name a program".to_string());
        }
        if !(0.0..=1.0).contains(&self.near_miss_threshold) {
            return Err("near_miss_threshold must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Invalid {
        path: Option<PathBuf>,
        message: String,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Invalid { path: None, message } => ConfigError::Invalid {
                path: Some(path),
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => {
                    write!(f, "failed to parse config TOML ({}): {}", path.display(), source)
                }
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Invalid { path, message } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), message),
                None => write!(f, "invalid config: {}", message),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config.validate().map_err(|message| ConfigError::Invalid {
        path: None,
        message,
    })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}
