//! Text cleanup shared by every event source.

/// Normalize a feed text value for display.
///
/// Newlines and runs of whitespace collapse to single spaces, iCalendar
/// backslash escapes are undone and percent-encoded sequences are decoded.
/// Decoding repeats until the text is stable, so normalized text normalizes
/// to itself.
pub fn normalize_text(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        // Every pass that changes the text also shortens it
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let unescaped = unescape(raw);
    let decoded = if unescaped.contains('%') {
        match urlencoding::decode(&unescaped) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => unescaped,
        }
    } else {
        unescaped
    };
    collapse_whitespace(&decoded)
}

/// Undo iCalendar text escapes (`\\`, `\,`, `\;`, `\n`)
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(next @ ('\\' | ',' | ';' | ':' | '"')) => out.push(next),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to `max_chars` characters, appending `...` when anything was removed
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Normalize a color value to `#RRGGBB`.
///
/// Accepts an optional leading `#`, 3-digit shorthand and 8-digit values with a
/// trailing alpha channel. Anything else yields `None`.
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#').to_ascii_uppercase();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let six = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex,
        8 => hex[..6].to_string(),
        _ => return None,
    };
    Some(format!("#{six}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Team\\, weekly\\; sync"), "Team, weekly; sync");
        assert_eq!(normalize_text("  Line one\nline   two \r\n"), "Line one line two");
        assert_eq!(normalize_text("Path C:\\\\tmp"), "Path C:\\tmp");
        assert_eq!(normalize_text("Caf%C3%A9%20night"), "Café night");
        assert_eq!(normalize_text("Notes\\nmore notes"), "Notes more notes");
        assert_eq!(normalize_text("C++ study"), "C++ study");
        // Escapes uncovered by one decoding pass are decoded as well
        assert_eq!(normalize_text("Tools \\\\, parts"), "Tools , parts");
        assert_eq!(normalize_text("Discount %2525"), "Discount %");
    }

    #[test]
    fn test_normalize_text_is_idempotent() {
        let samples = [
            "Team\\, weekly\\; sync",
            "  spaced   out\ttext ",
            "Caf%C3%A9 night",
            "100% done",
            "Lunch \\n with\\\\ friends",
            "Tools \\\\, parts",
            "Discount %2525",
            "",
        ];
        for sample in samples {
            let once = normalize_text(sample);
            assert_eq!(normalize_text(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly 10", 10), "exactly 10");
        assert_eq!(truncate_chars("Quarterly planning", 10), "Quarterly ...");
        assert_eq!(truncate_chars("定例ミーティング（営業部）", 10), "定例ミーティング（営...");
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("ff0000"), Some("#FF0000".to_string()));
        assert_eq!(normalize_color("#0a0"), Some("#00AA00".to_string()));
        assert_eq!(normalize_color("#FF2968FF"), Some("#FF2968".to_string()));
        assert_eq!(normalize_color("turquoise"), None);
        assert_eq!(normalize_color("#12345"), None);
        assert_eq!(normalize_color(""), None);
    }
}
