//! The safety gate: lexical checks on a proposed replacement.
//!
//! Two checks run in order. Identifier drift is a hard stop with no override;
//! it is a strong signal of an unintended rename and is cheap to over-block
//! on. A reduced import count only warns, and the caller may override.

use crate::lexical::{count_imports, extract_identifiers, FileKind};
use std::collections::BTreeSet;
use std::fmt;

/// Why the gate blocked an operation outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    IdentifierSetChanged {
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
    },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::IdentifierSetChanged { added, removed } => {
                write!(f, "identifier set changed")?;
                if !added.is_empty() {
                    write!(f, "; added: {}", join(added))?;
                }
                if !removed.is_empty() {
                    write!(f, "; removed: {}", join(removed))?;
                }
                Ok(())
            }
        }
    }
}

/// Why the gate wants confirmation before continuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnReason {
    ImportCountReduced { old: usize, new: usize },
}

impl fmt::Display for WarnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarnReason::ImportCountReduced { old, new } => {
                write!(f, "import count reduced from {} to {}", old, new)
            }
        }
    }
}

/// Verdict of the gate over an (old, new) fragment pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a gate verdict decides whether the write may proceed"]
pub enum GateVerdict {
    Pass,
    /// Hard stop, no override.
    Blocked(BlockReason),
    /// Soft stop; the caller must explicitly confirm continuation.
    Warn(WarnReason),
}

/// Evaluate the proposed replacement.
///
/// The identifier check short-circuits: when it blocks, the import check is
/// not evaluated. `kind` is the target file's language family; files outside
/// a known family skip the import heuristic (identifier check still applies).
pub fn evaluate(old: &str, new: &str, kind: Option<FileKind>) -> GateVerdict {
    let old_ids = extract_identifiers(old);
    let new_ids = extract_identifiers(new);
    if old_ids != new_ids {
        let added = new_ids.difference(&old_ids).cloned().collect();
        let removed = old_ids.difference(&new_ids).cloned().collect();
        return GateVerdict::Blocked(BlockReason::IdentifierSetChanged { added, removed });
    }

    if let Some(kind) = kind {
        let old_imports = count_imports(old, kind);
        let new_imports = count_imports(new, kind);
        if new_imports < old_imports {
            return GateVerdict::Warn(WarnReason::ImportCountReduced {
                old: old_imports,
                new: new_imports,
            });
        }
    }

    GateVerdict::Pass
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_identifiers_different_formatting_pass() {
        let old = "def add(a, b):\n    return a + b";
        let new = "def add(a, b):\n        return a+b";
        assert_eq!(evaluate(old, new, Some(FileKind::Python)), GateVerdict::Pass);
    }

    #[test]
    fn operator_change_with_same_identifiers_passes() {
        let old = "def add(a, b):\n    return a + b";
        let new = "def add(a, b):\n    return a - b";
        assert_eq!(evaluate(old, new, Some(FileKind::Python)), GateVerdict::Pass);
    }

    #[test]
    fn renamed_parameters_block() {
        let old = "def add(a, b):\n    return a + b";
        let new = "def add(x, y):\n    return x - y";
        match evaluate(old, new, Some(FileKind::Python)) {
            GateVerdict::Blocked(BlockReason::IdentifierSetChanged { added, removed }) => {
                assert!(added.contains("x") && added.contains("y"));
                assert!(removed.contains("a") && removed.contains("b"));
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn added_identifier_blocks_too() {
        let old = "x = 1";
        let new = "x = 1\ny = 2";
        assert!(matches!(
            evaluate(old, new, None),
            GateVerdict::Blocked(BlockReason::IdentifierSetChanged { .. })
        ));
    }

    #[test]
    fn reduced_imports_warn() {
        let old = "import os\nimport re\nos = re";
        let new = "import os\nos = re";
        assert_eq!(
            evaluate(old, new, Some(FileKind::Python)),
            GateVerdict::Warn(WarnReason::ImportCountReduced { old: 2, new: 1 })
        );
    }

    #[test]
    fn equal_or_increased_imports_never_warn() {
        let old = "const fs = require('fs');";
        let same = "const fs = require('fs') ;";
        let more = "const fs = require('fs');\nconst os = require('os');\nlet fs2 = fs, os2 = os;";
        assert_eq!(evaluate(old, same, Some(FileKind::Ecma)), GateVerdict::Pass);
        // Identifier check runs first, so keep the sets equal on both sides.
        let old_matching = "const fs = require('fs');\nlet fs2 = fs;\nlet os = 0, os2 = 0;";
        assert_eq!(
            evaluate(old_matching, more, Some(FileKind::Ecma)),
            GateVerdict::Pass
        );
    }

    #[test]
    fn identifier_block_short_circuits_import_warning() {
        // Both fewer imports and changed identifiers: the block wins.
        let old = "import os\nimport re\nx = os";
        let new = "import os\ny = os";
        assert!(matches!(
            evaluate(old, new, Some(FileKind::Python)),
            GateVerdict::Blocked(_)
        ));
    }
}
