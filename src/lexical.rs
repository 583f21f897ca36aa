//! Coarse lexical heuristics over source fragments.
//!
//! Nothing here understands language semantics. Identifier sets are purely
//! lexical (keywords included) and exist only for equality comparison; import
//! counts are family-specific pattern counts used as a non-regression signal.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier regex"));

/// Line-anchored declarative imports: `import x`, `from x import y`.
static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:import|from)\s").expect("python import regex"));

/// Call-or-statement imports anywhere in the text: `require(...)`, `import x`.
static ECMA_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brequire\s*\(|\bimport\s").expect("ecma import regex"));

/// Language family of a candidate file, keyed by extension.
///
/// Adding a family means adding a variant plus its entry in [`from_path`] and
/// a validator registration; matching and normalization are family-agnostic.
///
/// [`from_path`]: FileKind::from_path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Declarative-import family (`import` / `from` at line start).
    Python,
    /// `require(...)` / `import` family (js, ejs, ts, jsx).
    Ecma,
}

impl FileKind {
    /// Determine the family from a file's extension. `None` for extensions
    /// the engine does not recognize.
    pub fn from_path(path: &Path) -> Option<FileKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" => Some(FileKind::Python),
            "js" | "ejs" | "ts" | "jsx" => Some(FileKind::Ecma),
            _ => None,
        }
    }
}

/// Extract the set of distinct identifier tokens from a fragment.
///
/// Maximal runs of `[A-Za-z_][A-Za-z0-9_]*`; language keywords are not
/// filtered out. Used only for set equality, never for scoping.
pub fn extract_identifiers(text: &str) -> BTreeSet<String> {
    IDENT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Count import-like statements in a fragment using the family heuristic.
pub fn count_imports(text: &str, kind: FileKind) -> usize {
    match kind {
        FileKind::Python => PY_IMPORT_RE.find_iter(text).count(),
        FileKind::Ecma => ECMA_IMPORT_RE.find_iter(text).count(),
    }
}
