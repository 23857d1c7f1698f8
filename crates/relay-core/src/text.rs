//! Small text helpers.

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Truncate to at most `max_chars` characters, appending [`ELLIPSIS`] when
/// anything was cut. Counts `char`s, never splits a code point.
#[must_use]
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &text[..byte_idx]),
        None => text.to_owned(),
    }
}

/// Escape every backtick so the text cannot open or close a markdown code span.
///
/// Backslashes are escaped first so a trailing backslash cannot swallow the
/// closing delimiter.
#[must_use]
pub fn escape_backticks(text: &str) -> String {
    text.replace('\\', "\\\\").replace('`', "\\`")
}
