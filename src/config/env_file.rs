//! `KEY=VALUE` settings file parsing

use crate::types::MirrorError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parse `KEY=VALUE` lines
///
/// Blank lines, `#` comments and lines without `=` are ignored. Keys and values
/// are trimmed, one pair of matching surrounding quotes is removed from the
/// value, and the last occurrence of a key wins.
pub fn parse_env(contents: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    pairs
}

/// Read and parse a settings file
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, MirrorError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        MirrorError::Config(format!("Could not read config file {}: {}", path.display(), e))
    })?;
    Ok(parse_env(&contents))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
