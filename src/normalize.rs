//! Whitespace canonicalization for fragment comparison.
//!
//! Matching is whitespace-insensitive but case-sensitive: two blocks are
//! considered equal when their normalized forms are byte-equal. The
//! normalized form is never written back; substitution always uses the raw
//! matched text.

/// Collapse every maximal run of whitespace to a single space and trim the
/// ends.
///
/// Pure and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Number of lines a fragment spans when matched as whole-line windows.
pub fn line_span(fragment: &str) -> usize {
    fragment.matches('\n').count() + 1
}
