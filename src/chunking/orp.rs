/// Fixation ratio for units holding a single word.
pub const SINGLE_WORD_ORP_RATIO: f64 = 0.35;

/// Fixation ratio for multi-word units.
pub const MULTI_WORD_ORP_RATIO: f64 = 0.45;

/// Units this short are shown without a highlighted fixation point.
pub const MIN_HIGHLIGHT_CHARS: usize = 3;

/// Character offset of the optimal recognition point of `text`.
///
/// The ratio depends only on how many words the unit holds, so the same unit
/// always gets the same fixation point regardless of the policy that built
/// it. The offset is counted in `char`s and never lands on a space.
pub fn orp_index(text: &str, word_count: usize) -> Option<usize> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len <= MIN_HIGHLIGHT_CHARS {
        return None;
    }

    let ratio = if word_count > 1 {
        MULTI_WORD_ORP_RATIO
    } else {
        SINGLE_WORD_ORP_RATIO
    };

    let mut idx = ((len as f64 * ratio).floor() as usize).min(len - 1);
    if chars[idx].is_whitespace() {
        idx = if idx + 1 < len { idx + 1 } else { idx.saturating_sub(1) };
    }
    Some(idx)
}

/// Splits `text` around its fixation point for rendering: `(before, pivot, after)`.
pub fn split_at_orp(text: &str, orp: Option<usize>) -> (String, String, String) {
    match orp {
        Some(idx) => {
            let before: String = text.chars().take(idx).collect();
            let pivot: String = text.chars().skip(idx).take(1).collect();
            let after: String = text.chars().skip(idx + 1).collect();
            (before, pivot, after)
        }
        None => (text.to_string(), String::new(), String::new()),
    }
}
