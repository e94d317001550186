//! String truncation helpers.

/// Cut `s` to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Keep the first `max_chars` characters of the first line, appending `...`
/// when anything was dropped.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    let dropped_lines = first_line.len() < s.trim_end().len();

    if first_line.chars().count() <= max_chars {
        if dropped_lines {
            format!("{}...", first_line)
        } else {
            first_line.to_string()
        }
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
