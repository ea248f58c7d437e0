//! Logging helpers that keep document values and player names on a single log line.

/// Characters of a value kept before the log line is cut with `…`.
const PREVIEW_CHARS: usize = 300;

/// Render `s` on one log line: backslashes, newlines, tabs and other control
/// characters are escaped, and anything past the first 300 characters is dropped.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(PREVIEW_CHARS) + 8);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(PREVIEW_CHARS) {
        push_escaped(&mut out, ch);
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    use std::fmt::Write;
    match ch {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_control() => {
            let _ = write!(out, "\\x{:02X}", c as u32);
        }
        c => out.push(c),
    }
}

/// Join query parameters into the `a;b;c` reference used in storage error logs.
/// Missing parameters render as `null`.
pub fn reference<'a>(params: impl IntoIterator<Item = Option<&'a str>>) -> String {
    params
        .into_iter()
        .map(|p| p.map(escape_log).unwrap_or_else(|| "null".to_string()))
        .collect::<Vec<_>>()
        .join(";")
}
