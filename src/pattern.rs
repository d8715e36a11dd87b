//! Translation of contract patterns into host regexes.
//!
//! Contracts write patterns either as plain or quoted text, or in
//! `/pattern/flags` form where `i` makes the match case-insensitive and `m`
//! enables multi-line anchors. Patterns are searched, not anchored: a
//! contract that wants a full match writes `^...$` itself.

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// Translate and compile a contract pattern.
///
/// # Errors
///
/// Returns `PatternError` when the translated pattern does not compile.
pub fn translate(pattern: &str) -> Result<Regex, PatternError> {
    let (body, flags) = split_pattern(pattern);
    RegexBuilder::new(body)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .build()
        .map_err(|e| PatternError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Split a pattern into its body and flags.
fn split_pattern(pattern: &str) -> (&str, &str) {
    let trimmed = pattern.trim();
    if trimmed.len() >= 2 {
        let quoted = (trimmed.starts_with('\'') && trimmed.ends_with('\''))
            || (trimmed.starts_with('"') && trimmed.ends_with('"'));
        if quoted {
            return (&trimmed[1..trimmed.len() - 1], "");
        }
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        if let Some(close) = rest.rfind('/') {
            let flags = &rest[close + 1..];
            if flags.chars().all(|c| matches!(c, 'g' | 'i' | 'm')) {
                return (&rest[..close], flags);
            }
        }
    }

    (trimmed, "")
}

/// Translate and test a value in one step.
///
/// # Errors
///
/// Returns `PatternError` when the pattern does not compile.
pub fn is_match(pattern: &str, value: &str) -> Result<bool, PatternError> {
    translate(pattern).map(|re| re.is_match(value))
}
