/// Join folded feed lines into logical content lines.
///
/// A line starting with a space or tab continues the previous line; that one
/// whitespace character is dropped. Continuations with nothing before them are
/// discarded. Trailing whitespace (including `\r`) is trimmed from every result.
pub fn unfold(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.split('\n') {
        if line.starts_with([' ', '\t']) {
            if let Some(current) = current.as_mut() {
                current.push_str(line[1..].trim_end_matches('\r'));
            }
            continue;
        }

        if let Some(done) = current.take() {
            push_trimmed(&mut lines, done);
        }
        current = Some(line.trim_end_matches('\r').to_string());
    }

    if let Some(done) = current {
        push_trimmed(&mut lines, done);
    }

    lines
}

fn push_trimmed(lines: &mut Vec<String>, line: String) {
    let trimmed = line.trim_end();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
}
