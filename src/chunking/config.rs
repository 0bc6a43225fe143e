use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed-class words a chunk is never allowed to end on.
pub const DEFAULT_LINKING_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "yet", "so", "of", "to", "in", "on", "at",
    "by", "with", "from", "for", "as", "if", "than", "that",
];

/// How many words are grouped into one presentation unit.
///
/// Serialized the way the settings file spells it: `1`, `2`, `3` or `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PolicyRepr", into = "PolicyRepr")]
pub enum ChunkPolicy {
    #[default]
    Single,
    Pair,
    Triple,
    /// Randomly targets 3 or 4 words per chunk for rhythm variance.
    Auto,
}

impl ChunkPolicy {
    pub fn is_single(self) -> bool {
        self == ChunkPolicy::Single
    }

    /// Fixed target size, `None` for `Auto`.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ChunkPolicy::Single => Some(1),
            ChunkPolicy::Pair => Some(2),
            ChunkPolicy::Triple => Some(3),
            ChunkPolicy::Auto => None,
        }
    }

    /// Word target for the next chunk. Only `Auto` consumes randomness.
    pub fn next_target<R: Rng + ?Sized>(self, rng: &mut R) -> usize {
        match self.fixed_size() {
            Some(size) => size,
            None => rng.gen_range(3..=4),
        }
    }
}

impl fmt::Display for ChunkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkPolicy::Single => f.write_str("1"),
            ChunkPolicy::Pair => f.write_str("2"),
            ChunkPolicy::Triple => f.write_str("3"),
            ChunkPolicy::Auto => f.write_str("auto"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Size(u8),
    Named(String),
}

impl TryFrom<PolicyRepr> for ChunkPolicy {
    type Error = String;

    fn try_from(value: PolicyRepr) -> Result<Self, Self::Error> {
        match value {
            PolicyRepr::Size(1) => Ok(ChunkPolicy::Single),
            PolicyRepr::Size(2) => Ok(ChunkPolicy::Pair),
            PolicyRepr::Size(3) => Ok(ChunkPolicy::Triple),
            PolicyRepr::Size(other) => Err(format!("unsupported chunk size {other}")),
            PolicyRepr::Named(name) => name.parse(),
        }
    }
}

impl From<ChunkPolicy> for PolicyRepr {
    fn from(policy: ChunkPolicy) -> Self {
        match policy {
            ChunkPolicy::Single => PolicyRepr::Size(1),
            ChunkPolicy::Pair => PolicyRepr::Size(2),
            ChunkPolicy::Triple => PolicyRepr::Size(3),
            ChunkPolicy::Auto => PolicyRepr::Named("auto".into()),
        }
    }
}

impl std::str::FromStr for ChunkPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "single" => Ok(ChunkPolicy::Single),
            "2" | "pair" => Ok(ChunkPolicy::Pair),
            "3" | "triple" => Ok(ChunkPolicy::Triple),
            "auto" => Ok(ChunkPolicy::Auto),
            other => Err(format!("unknown chunk policy '{other}'")),
        }
    }
}

/// Configuration for the chunker with tunable thresholds.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub policy: ChunkPolicy,

    /// Lowercased words a chunk may not end on (pull-forward rule)
    pub linking_words: HashSet<String>,

    /// Words at least this long are shown on their own
    pub long_word_chars: usize,

    /// Soft comma boundary applies only once the chunk is longer than this
    pub soft_break_min_chars: usize,
}

impl ChunkConfig {
    pub fn new(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn with_linking_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.linking_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    pub fn is_linking_word(&self, word: &str) -> bool {
        let bare = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        !bare.is_empty() && self.linking_words.contains(&bare)
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            policy: ChunkPolicy::Single,
            linking_words: DEFAULT_LINKING_WORDS.iter().map(|w| w.to_string()).collect(),
            long_word_chars: 20,
            soft_break_min_chars: 15,
        }
    }
}
