pub mod algorithm;
pub mod config;
pub mod normalize;
pub mod orp;

pub use algorithm::{chunk_text, ends_sentence, remap_cursor, unit_at_word, words_between, TextUnit};
pub use config::{ChunkConfig, ChunkPolicy, DEFAULT_LINKING_WORDS};
pub use normalize::normalize_text;
pub use orp::{orp_index, split_at_orp};
