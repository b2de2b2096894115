use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of `text` in terminal cells.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Word-wraps a node label to `max_width` cells and at most `max_lines`
/// lines. Overlong words are cut, and a label that does not fit ends in `…`.
pub fn wrap_label(text: &str, max_width: usize, max_lines: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word = truncate(word, max_width);
        let needed = if current.is_empty() {
            display_width(&word)
        } else {
            display_width(&current) + 1 + display_width(&word)
        };
        if needed > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines.max(1) {
        lines.truncate(max_lines.max(1));
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(last, max_width);
        }
    }
    lines
}

/// Longest prefix of `text` that fits in `max_width` cells.
pub fn truncate(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(ch);
    }
    out
}

fn with_ellipsis(line: &str, max_width: usize) -> String {
    let mut cut = truncate(line, max_width.saturating_sub(1));
    cut.push('…');
    cut
}
