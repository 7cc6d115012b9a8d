//! YAML utilities for iRacing session data
//!
//! iRacing's session YAML is not always valid YAML:
//! - driver and team names are written unquoted, so `O'Connor, Mike` or a
//!   leading `"` breaks the scanner
//! - livery strings (`CarDesignStr`) can start with a comma
//! - stray control characters appear in user-entered text
//!
//! This module repairs those issues without parsing.

use crate::{Result, TelemetryError};

/// Keys whose values iRacing writes without quoting.
const UNQUOTED_KEYS: &[&str] = &[
    "AbbrevName:",
    "TeamName:",
    "UserName:",
    "Initials:",
    "DriverSetupName:",
    "CarDesignStr:",
];

/// Repair iRacing YAML so a standard parser accepts it.
///
/// Control characters other than `\n`, `\r` and `\t` are dropped, and the
/// values of [`UNQUOTED_KEYS`] are wrapped in single quotes with embedded
/// single quotes doubled.
pub fn preprocess_iracing_yaml(yaml: &str) -> Result<String> {
    let cleaned: String = yaml
        .chars()
        .filter(|&ch| !ch.is_control() || matches!(ch, '\n' | '\r' | '\t'))
        .collect();

    if cleaned.trim().is_empty() {
        return Err(TelemetryError::parse("YAML preprocessing", "YAML is empty after preprocessing"));
    }

    let mut result = String::with_capacity(cleaned.len() + 64);
    for line in cleaned.lines() {
        result.push_str(&quote_line(line));
        result.push('\n');
    }

    Ok(result)
}

fn quote_line(line: &str) -> String {
    for key in UNQUOTED_KEYS {
        let Some(key_pos) = line.find(key) else {
            continue;
        };

        let after_key = key_pos + key.len();
        let rest = &line[after_key..];
        let Some(value_start) = rest.find(|c: char| !c.is_whitespace()) else {
            return line.to_string();
        };

        let value = rest[value_start..].trim_end();
        if value.starts_with('\'') || value.starts_with('"') {
            return line.to_string();
        }

        return format!("{}{}'{}'", &line[..after_key], &rest[..value_start], value.replace('\'', "''"));
    }

    line.to_string()
}

/// Extract the session YAML text from its block in the region.
///
/// The block is NUL-terminated when shorter than its declared length.
pub fn extract_yaml(block: &[u8]) -> Result<String> {
    let end = block.iter().position(|&b| b == 0).unwrap_or(block.len());
    let yaml = String::from_utf8_lossy(&block[..end]).into_owned();

    if yaml.trim().is_empty() {
        return Err(TelemetryError::parse("Session YAML extraction", "Extracted YAML string is empty"));
    }

    Ok(yaml)
}
