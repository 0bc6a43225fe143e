use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chunking::config::{ChunkConfig, ChunkPolicy};
use crate::chunking::normalize::normalize_text;
use crate::chunking::orp::orp_index;

const SENTENCE_ENDINGS: &[char] = &['.', '?', '!', ':'];
const CLAUSE_ENDINGS: &[char] = &[',', ';'];
const TRAILING_CLOSERS: &[char] = &['"', '\'', '\u{201D}', '\u{2019}', ')', ']', '}', '\u{00BB}'];

/// One presentation unit: a word or short phrase shown at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUnit {
    pub text: String,
    pub length_chars: usize,
    pub word_count: usize,
    /// Character offset of the fixation point, `None` for very short units.
    pub orp_index: Option<usize>,
    pub ends_sentence: bool,
    pub ends_clause: bool,
}

impl TextUnit {
    fn from_words(words: &[&str]) -> Self {
        let text = words.join(" ");
        let length_chars = text.chars().count();
        let last = words.last().copied().unwrap_or_default();
        Self {
            orp_index: orp_index(&text, words.len()),
            length_chars,
            word_count: words.len(),
            ends_sentence: ends_sentence(last),
            ends_clause: ends_clause(last),
            text,
        }
    }
}

fn strip_closers(word: &str) -> &str {
    word.trim_end_matches(TRAILING_CLOSERS)
}

pub fn ends_sentence(word: &str) -> bool {
    strip_closers(word).ends_with(SENTENCE_ENDINGS)
}

pub fn ends_clause(word: &str) -> bool {
    strip_closers(word).ends_with(CLAUSE_ENDINGS)
}

/// Main chunking function: transforms raw text into presentation units.
///
/// Chunks grow word by word until the policy's target size is reached, a
/// sentence ends, or a comma closes an already long chunk. A chunk never ends
/// on a linking word while more text follows, and very long words stand alone.
pub fn chunk_text<R: Rng + ?Sized>(raw: &str, config: &ChunkConfig, rng: &mut R) -> Vec<TextUnit> {
    let normalized = normalize_text(raw);
    if normalized.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = normalized.split(' ').collect();

    // Edge case: a fixed policy asking for more words than exist
    let policy = match config.policy.fixed_size() {
        Some(size) if size > words.len() => ChunkPolicy::Single,
        _ => config.policy,
    };

    if policy.is_single() {
        return words.iter().map(|w| TextUnit::from_words(&[w])).collect();
    }

    let mut units = Vec::new();
    let mut chunk: Vec<&str> = Vec::new();
    let mut target = policy.next_target(rng);
    let mut i = 0;

    while i < words.len() {
        let word = words[i];
        let is_long = word.chars().count() >= config.long_word_chars;

        if is_long && !chunk.is_empty() {
            units.push(TextUnit::from_words(&chunk));
            chunk.clear();
            target = policy.next_target(rng);
        }

        chunk.push(word);
        i += 1;

        // Pull-forward: never leave a linking word dangling at the end,
        // unless it closes a sentence
        while i < words.len() && !ends_on_sentence(&chunk) && ends_on_linking_word(&chunk, config) {
            chunk.push(words[i]);
            i += 1;
        }

        let last = chunk.last().copied().unwrap_or_default();
        let chunk_chars = chunk.iter().map(|w| w.chars().count()).sum::<usize>() + chunk.len() - 1;

        let hard_break = ends_sentence(last);
        let soft_break = ends_clause(last)
            && chunk.len() >= 2
            && chunk_chars > config.soft_break_min_chars;
        let long_break = last.chars().count() >= config.long_word_chars;

        if hard_break || soft_break || long_break || chunk.len() >= target {
            units.push(TextUnit::from_words(&chunk));
            chunk.clear();
            target = policy.next_target(rng);
        }
    }

    if !chunk.is_empty() {
        units.push(TextUnit::from_words(&chunk));
    }

    units
}

fn ends_on_sentence(chunk: &[&str]) -> bool {
    chunk.last().map(|w| ends_sentence(w)).unwrap_or(false)
}

fn ends_on_linking_word(chunk: &[&str], config: &ChunkConfig) -> bool {
    chunk
        .last()
        .map(|w| config.is_linking_word(w))
        .unwrap_or(false)
}

/// Sum of word counts of the units in `[from, to)`; empty when `to <= from`.
pub fn words_between(units: &[TextUnit], from: usize, to: usize) -> usize {
    let to = to.min(units.len());
    if to <= from {
        return 0;
    }
    units[from..to].iter().map(|u| u.word_count).sum()
}

/// Index of the unit containing the `word_offset`-th word, clamped to the sequence end.
pub fn unit_at_word(units: &[TextUnit], word_offset: usize) -> usize {
    let mut seen = 0;
    for (idx, unit) in units.iter().enumerate() {
        if seen + unit.word_count > word_offset {
            return idx;
        }
        seen += unit.word_count;
    }
    units.len()
}

/// Maps a cursor onto a re-chunked sequence, keeping its relative position.
pub fn remap_cursor(cursor: usize, old_len: usize, new_len: usize) -> usize {
    if old_len == 0 || new_len == 0 {
        return 0;
    }
    let ratio = cursor.min(old_len) as f64 / old_len as f64;
    ((ratio * new_len as f64).round() as usize).min(new_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn texts(units: &[TextUnit]) -> Vec<&str> {
        units.iter().map(|u| u.text.as_str()).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn pulls_linking_word_forward_and_breaks_on_sentence() {
        let config = ChunkConfig::new(ChunkPolicy::Pair).with_linking_words(["but"]);
        let units = chunk_text("However, I went home. I was tired, but happy.", &config, &mut rng());
        let texts = texts(&units);

        assert!(texts.contains(&"tired, but happy."), "{texts:?}");
        let home = texts.iter().position(|t| t.ends_with("home.")).unwrap();
        assert!(texts[home + 1].starts_with("I "));
        assert!(units[home].ends_sentence);
    }

    #[test]
    fn sentence_end_breaks_before_target() {
        let config = ChunkConfig::new(ChunkPolicy::Triple).with_linking_words(Vec::<&str>::new());
        let units = chunk_text("Stop. Go on now please.", &config, &mut rng());
        assert_eq!(texts(&units), vec!["Stop.", "Go on now", "please."]);
    }

    #[test]
    fn soft_comma_break_needs_two_words_and_length() {
        let config = ChunkConfig::new(ChunkPolicy::Auto).with_linking_words(Vec::<&str>::new());
        let units = chunk_text("Remarkably fortunate, we continued onward today", &config, &mut rng());
        assert_eq!(units[0].text, "Remarkably fortunate,");
        assert!(units[0].ends_clause);

        let short = chunk_text("Yes sir, we continued onward today", &config, &mut rng());
        assert_ne!(short[0].text, "Yes sir,");
    }

    #[test]
    fn semicolon_is_a_soft_break_too() {
        let config = ChunkConfig::new(ChunkPolicy::Auto).with_linking_words(Vec::<&str>::new());
        let units = chunk_text("Remarkably fortunate; we continued onward today", &config, &mut rng());
        assert_eq!(units[0].text, "Remarkably fortunate;");
        assert!(units[0].ends_clause);

        let quoted = chunk_text("Remarkably \"fortunate,\" we continued onward today", &config, &mut rng());
        assert_eq!(quoted[0].text, "Remarkably \"fortunate,\"");
    }

    #[test]
    fn linking_word_closing_a_sentence_stays_put() {
        let config = ChunkConfig::new(ChunkPolicy::Pair);
        let units = chunk_text("I think so. Then we left.", &config, &mut rng());
        assert_eq!(texts(&units), vec!["I think", "so.", "Then we", "left."]);
        assert!(units[1].ends_sentence);

        let units = chunk_text("We went to. Then home", &config, &mut rng());
        assert_eq!(texts(&units), vec!["We went", "to.", "Then home"]);
    }

    #[test]
    fn long_word_is_shown_alone() {
        let config = ChunkConfig::new(ChunkPolicy::Triple);
        let units = chunk_text("we saw incomprehensibilities everywhere today", &config, &mut rng());
        assert_eq!(texts(&units), vec!["we saw", "incomprehensibilities", "everywhere today"]);
    }

    #[test]
    fn single_policy_is_one_word_per_unit() {
        let units = chunk_text("and the cat", &ChunkConfig::default(), &mut rng());
        assert_eq!(texts(&units), vec!["and", "the", "cat"]);
        assert!(units.iter().all(|u| u.word_count == 1));
    }

    #[test]
    fn oversized_policy_falls_back_to_single() {
        let config = ChunkConfig::new(ChunkPolicy::Triple);
        let units = chunk_text("hello there", &config, &mut rng());
        assert_eq!(texts(&units), vec!["hello", "there"]);
    }

    #[test]
    fn empty_text_yields_no_units() {
        assert!(chunk_text("   \n ", &ChunkConfig::new(ChunkPolicy::Auto), &mut rng()).is_empty());
    }

    #[test]
    fn auto_policy_is_deterministic_for_a_seed() {
        let config = ChunkConfig::new(ChunkPolicy::Auto).with_linking_words(Vec::<&str>::new());
        let text = "one two three four five six seven eight nine ten eleven twelve thirteen";
        let a = chunk_text(text, &config, &mut StdRng::seed_from_u64(42));
        let b = chunk_text(text, &config, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a[..a.len() - 1].iter().all(|u| (3..=4).contains(&u.word_count)));
    }

    #[test]
    fn joining_units_reconstructs_normalized_text() {
        let raw = "The  quick brown fox,\njumps over the lazy dog. And then? It slept: soundly, of course!";
        for policy in [ChunkPolicy::Single, ChunkPolicy::Pair, ChunkPolicy::Triple, ChunkPolicy::Auto] {
            let units = chunk_text(raw, &ChunkConfig::new(policy), &mut rng());
            let joined = texts(&units).join(" ");
            assert_eq!(joined, normalize_text(raw), "policy {policy}");
        }
    }

    #[test]
    fn word_helpers_follow_unit_word_counts() {
        let config = ChunkConfig::new(ChunkPolicy::Pair).with_linking_words(Vec::<&str>::new());
        let units = chunk_text("a b c d e", &config, &mut rng());
        assert_eq!(texts(&units), vec!["a b", "c d", "e"]);
        assert_eq!(words_between(&units, 0, 2), 4);
        assert_eq!(words_between(&units, 2, 1), 0);
        assert_eq!(words_between(&units, 1, 99), 3);
        assert_eq!(unit_at_word(&units, 3), 1);
        assert_eq!(unit_at_word(&units, 4), 2);
        assert_eq!(unit_at_word(&units, 50), 3);
    }

    #[test]
    fn remap_preserves_ratio() {
        assert_eq!(remap_cursor(50, 100, 40), 20);
        assert_eq!(remap_cursor(100, 100, 33), 33);
        assert_eq!(remap_cursor(0, 100, 33), 0);
        assert_eq!(remap_cursor(5, 0, 10), 0);
        assert_eq!(remap_cursor(500, 100, 10), 10);
    }
}
