// Text layer: normalization and tokenization shared by both engines.

pub mod normalize;
pub mod tokenizer;

pub use normalize::{fold_for_keywords, normalize, strip_accents};
pub use tokenizer::tokenize;
