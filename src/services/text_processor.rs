// Text Processing Helpers
// Character-based measurements for the dispatch gate, error echoes and log lines

/// Unicode scalar count of the trimmed text (not UTF-8 byte length).
pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// First `max_chars` characters, cut on a char boundary.
pub fn char_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Single-line excerpt for log output.
pub fn log_excerpt(text: &str, max_chars: usize) -> String {
    let mut out = char_prefix(text, max_chars);
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace(|c: char| c == '\n' || c == '\r', " ")
}
