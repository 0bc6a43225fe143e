/// Characters that carry no visible content and are dropped outright.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// Cleans raw text before splitting: joins words hyphenated across a line
/// wrap, drops invisible characters, maps control characters to spaces and
/// collapses every whitespace run into a single space.
///
/// Runs even when the provider already cleaned the text.
pub fn normalize_text(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut joined = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '-' {
            if let Some(resume) = line_wrap_continuation(&chars, i) {
                i = resume;
                continue;
            }
        }

        if is_invisible(c) {
            i += 1;
            continue;
        }

        if c.is_control() || c.is_whitespace() {
            joined.push(' ');
        } else {
            joined.push(c);
        }
        i += 1;
    }

    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// For a hyphen at `at`, returns the index of the first letter of the
/// continuation when the hyphen ends a wrapped line (`exam-\nple`).
fn line_wrap_continuation(chars: &[char], at: usize) -> Option<usize> {
    let before = at.checked_sub(1).map(|p| chars[p])?;
    if !before.is_alphabetic() {
        return None;
    }

    let mut j = at + 1;
    while j < chars.len() && matches!(chars[j], ' ' | '\t') {
        j += 1;
    }
    if j >= chars.len() || !matches!(chars[j], '\n' | '\r') {
        return None;
    }
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }

    match chars.get(j) {
        Some(next) if next.is_lowercase() => Some(j),
        _ => None,
    }
}
