//! Small text helpers shared by the prompt builder, parser and aggregator.

/// Largest prefix of `text` holding at most `max_chars` characters.
///
/// Returns the prefix and whether anything was cut. Never splits a UTF-8
/// code point.
pub fn char_prefix(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Truncate for display, appending an ellipsis when cut.
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    let (prefix, cut) = char_prefix(text, max_chars);
    if cut {
        format!("{}...", prefix)
    } else {
        prefix.to_string()
    }
}

/// Case- and whitespace-insensitive key used for deduplication.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collapse inner whitespace runs and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Forward-slash, root-relative form of a path string.
pub fn normalize_rel_path(path: &str) -> String {
    path.replace('\\', "/")
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}
