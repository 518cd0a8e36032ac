//! Identifier source
//!
//! Reads the operator-supplied list of object identifiers, one per line.

use std::path::Path;

use crate::error::ExportError;

/// Load pids from a newline-delimited file, skipping blank lines.
pub fn load_pids(path: &Path) -> Result<Vec<String>, ExportError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
