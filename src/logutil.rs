//! Log sanitizing for chat-sourced strings.
//!
//! Display names and subject ids come straight from the chat platform and can carry
//! newlines, control characters or bidi overrides that garble a log line. Everything
//! user-supplied goes through [`escape_log`] before it reaches a log macro.

use std::fmt::Write;

/// Longest preview kept for a single logged value.
pub const MAX_LOG_PREVIEW: usize = 120;

/// Escape `s` for single-line logging, truncated to [`MAX_LOG_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, MAX_LOG_PREVIEW)
}

/// Same as [`escape_log`] with an explicit limit.
pub fn escape_log_with(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || is_invisible_format(c) => {
                let _ = write!(out, "\\u{{{:04x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Zero-width and bidi formatting characters common in decorated nicknames.
fn is_invisible_format(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}' | '\u{feff}')
}
