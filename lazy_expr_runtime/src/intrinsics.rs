//! String intrinsics
//!
//! Built-in string functions referenced by name from `Apply` nodes. Pattern
//! arguments are regular expressions; compiled patterns are not cached.

// SAFETY: usize→i32 casts are on string lengths of in-memory values.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use regex::Regex;
use std::collections::BTreeMap;

use crate::error::{RuntimeError, RuntimeResult};

fn compile(pattern: &str) -> RuntimeResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| RuntimeError::type_error(format!("invalid regular expression: {}", e)))
}

/// Number of characters
pub fn length(s: &str) -> i32 {
    s.chars().count() as i32
}

/// Replace every match of `pattern` with `replacement`
pub fn replace(s: &str, pattern: &str, replacement: &str) -> RuntimeResult<String> {
    Ok(compile(pattern)?.replace_all(s, replacement).into_owned())
}

/// Split on a delimiter pattern, producing at most `n` pieces when given
pub fn split(s: &str, delim: &str, n: Option<i32>) -> RuntimeResult<Vec<String>> {
    let re = compile(delim)?;
    let pieces: Vec<String> = match n {
        Some(n) if n > 0 => re.splitn(s, n as usize).map(str::to_string).collect(),
        _ => re.split(s).map(str::to_string).collect(),
    };
    Ok(pieces)
}

pub fn lower(s: &str) -> String {
    s.to_lowercase()
}

pub fn upper(s: &str) -> String {
    s.to_uppercase()
}

/// Trim leading and trailing whitespace
pub fn strip(s: &str) -> String {
    s.trim().to_string()
}

pub fn contains(s: &str, substr: &str) -> bool {
    s.contains(substr)
}

pub fn starts_with(s: &str, prefix: &str) -> bool {
    s.starts_with(prefix)
}

pub fn ends_with(s: &str, suffix: &str) -> bool {
    s.ends_with(suffix)
}

/// Capture groups of the first match, or `None` if nothing matches
///
/// Groups that did not participate in the match are returned as empty
/// strings.
pub fn first_match_in(s: &str, pattern: &str) -> RuntimeResult<Option<Vec<String>>> {
    let re = compile(pattern)?;
    Ok(re.captures(s).map(|caps| {
        caps.iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    }))
}

/// Replace characters according to a single-character mapping
pub fn translate(s: &str, mapping: &BTreeMap<String, String>) -> RuntimeResult<String> {
    let mut table = BTreeMap::new();
    for (from, to) in mapping {
        let mut chars = from.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                table.insert(c, to.as_str());
            }
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "translate keys must be single characters, found '{}'",
                    from
                )))
            }
        }
    }
    Ok(s.chars()
        .map(|c| match table.get(&c) {
            Some(to) => (*to).to_string(),
            None => c.to_string(),
        })
        .collect())
}

/// True if the pattern matches anywhere in the string
pub fn matches(pattern: &str, s: &str) -> RuntimeResult<bool> {
    Ok(compile(pattern)?.is_match(s))
}

pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

/// Character at a (possibly negative) index
pub fn char_at(s: &str, index: i32) -> RuntimeResult<String> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let resolved = if index < 0 {
        len as i64 + index as i64
    } else {
        index as i64
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(RuntimeError::bounds_error(index as i64, len));
    }
    Ok(chars[resolved as usize].to_string())
}
