//! Literal-encoded list cells.
//!
//! Several on-disk tables inherited from the original toolchain carry lists
//! inside single cells: feature vectors in the dataset cache, candidate id
//! lists in candidate files, and (id, score) tuples in local alignments.
//! The encoding is the Python literal notation those files were written
//! with, so a small codec is kept here instead of bending a generic format
//! to fit.

use ontoalign_core::{AlignError, Result};

/// Format a feature vector as `[0.1, 0.2, 0.3]`.
pub fn format_floats(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// Parse a `[0.1, 0.2, 0.3]` cell into a feature vector.
pub fn parse_floats(cell: &str) -> Result<Vec<f32>> {
    let inner = strip_brackets(cell)?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| AlignError::Table(format!("Bad float in list {cell:?}: {e}")))
        })
        .collect()
}

/// Parse a `['a', 'b']` (or `["a", "b"]`) cell into owned strings.
pub fn parse_strings(cell: &str) -> Result<Vec<String>> {
    let inner = strip_brackets(cell)?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        // skip separators and whitespace up to the next item
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let quote = match chars.next() {
            None => break,
            Some(q @ ('\'' | '"')) => q,
            Some(other) => {
                return Err(AlignError::Table(format!(
                    "Expected quoted item in list {cell:?}, found {other:?}"
                )))
            }
        };
        let mut item = String::new();
        loop {
            match chars.next() {
                Some(c) if c == quote => break,
                Some(c) => item.push(c),
                None => {
                    return Err(AlignError::Table(format!(
                        "Unterminated string in list {cell:?}"
                    )))
                }
            }
        }
        items.push(item);
    }
    Ok(items)
}

/// Format scored candidates as `[('a', 0.9), ('b', 0)]`.
pub fn format_scored(candidates: &[(String, f64)]) -> String {
    let parts: Vec<String> = candidates
        .iter()
        .map(|(tgt, score)| format!("('{tgt}', {score})"))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn strip_brackets(cell: &str) -> Result<&str> {
    let trimmed = cell.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .map(str::trim)
        .ok_or_else(|| AlignError::Table(format!("Expected bracketed list, got {cell:?}")))
}
