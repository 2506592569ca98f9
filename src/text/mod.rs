pub mod normalize;
pub mod words;

pub use normalize::{normalize_char, preprocess};
pub use words::{generate_masked_sentences, mask_word, split_words, word_spans};
