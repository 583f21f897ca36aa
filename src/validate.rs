//! Syntax validation capability.
//!
//! A validator answers one question about a file's post-write state: can this
//! content still be trusted? `false` always means "roll back". Validators
//! never mutate the file, and no diagnostics are surfaced; the verdict is the
//! whole contract.
//!
//! Two implementations cover the recognized families:
//! - in-process tree-sitter parse for Python (ERROR or missing nodes fail),
//! - an external "check only" command for the ECMA family (exit 0 passes,
//!   anything else, including a failed launch, fails).

use crate::config::EngineConfig;
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Capability interface: judge whether a file's current state is
/// syntactically acceptable. Implementations must not mutate the file.
pub trait SyntaxValidator {
    /// `path` is the rewritten file on disk; `content` is the same state in
    /// memory. Implementations use whichever their check needs.
    fn validate(&self, path: &Path, content: &str) -> bool;
}

/// In-process parse check for Python using tree-sitter.
///
/// The verdict is the absence of ERROR and missing nodes in the parse tree;
/// no diagnostics are collected.
pub struct PythonValidator;

impl SyntaxValidator for PythonValidator {
    fn validate(&self, _path: &Path, content: &str) -> bool {
        let mut parser = tree_sitter::Parser::new();
        if parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .is_err()
        {
            return false;
        }
        match parser.parse(content, None) {
            Some(tree) => !tree.root_node().has_error(),
            None => false,
        }
    }
}

/// External "syntax check only" invocation, e.g. `node --check <path>`.
///
/// stdout and stderr are discarded. A configured timeout bounds the wait;
/// with no timeout the invocation may block the cycle indefinitely (the
/// bound is policy, see `EngineConfig::validator_timeout_secs`).
pub struct ExternalCheckValidator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ExternalCheckValidator {
    /// Build from a command vector; the target path is appended at
    /// invocation time. Empty commands are rejected by config validation
    /// before reaching here.
    pub fn new(command: &[String], timeout: Option<Duration>) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => ("false".to_string(), Vec::new()),
        };
        Self {
            program,
            args,
            timeout,
        }
    }

    fn wait_with_timeout(&self, child: &mut std::process::Child) -> bool {
        let Some(timeout) = self.timeout else {
            return child.wait().map(|status| status.success()).unwrap_or(false);
        };
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return status.success(),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return false;
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(_) => return false,
            }
        }
    }
}

impl SyntaxValidator for ExternalCheckValidator {
    fn validate(&self, path: &Path, _content: &str) -> bool {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => self.wait_with_timeout(&mut child),
            // Failure to launch is a failed check, not an error.
            Err(_) => false,
        }
    }
}

/// Explicit extension-to-validator mapping.
///
/// Adding a language means adding a registration, not branching logic. A
/// file whose extension has no registration validates trivially; the default
/// registry covers every extension the default config scans.
pub struct ValidatorRegistry {
    by_extension: HashMap<String, Box<dyn SyntaxValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registry matching the engine defaults: `py` parses in-process, the
    /// ECMA extensions run the configured external check command.
    pub fn defaults(config: &EngineConfig) -> Self {
        let timeout = config.validator_timeout_secs.map(Duration::from_secs);
        let mut registry = Self::new();
        registry.register("py", Box::new(PythonValidator));
        for ext in ["js", "ejs", "ts", "jsx"] {
            registry.register(
                ext,
                Box::new(ExternalCheckValidator::new(&config.check_command, timeout)),
            );
        }
        registry
    }

    pub fn register(&mut self, extension: &str, validator: Box<dyn SyntaxValidator>) {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), validator);
    }

    /// Look up the validator for a path's extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn SyntaxValidator> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).map(|v| v.as_ref())
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
