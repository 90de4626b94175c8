//! Script file loading: one JSON object per line.
//!
//! The upstream script generator is an LLM, so the loader is lenient
//! about line-level noise: blank lines and trailing commas are
//! tolerated, and a line that still fails to parse is logged with its
//! line number and skipped rather than failing the batch.

use std::path::Path;

use serde_json::Value;

use crate::error::SchemaError;

/// Load a script file into raw JSON values, one per parseable line.
pub fn load_script(path: &Path) -> Result<Vec<Value>, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_lines(&text))
}

/// Parse JSONL text, skipping malformed lines with a warning.
pub fn parse_lines(text: &str) -> Vec<Value> {
    let mut values = Vec::new();
    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim().trim_end_matches(',');
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => values.push(value),
            Err(e) => {
                log::warn!("script line {}: skipping malformed record: {}", line_no + 1, e);
            }
        }
    }
    values
}
