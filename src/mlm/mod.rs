//! Masked language model access.
//!
//! The checker only talks to [`MaskedLm`]; the concrete model behind it is
//! either a BERT checkpoint run through candle ([`bert::BertMaskedLm`]) or a
//! lookup table ([`table::TableMaskedLm`]).

pub mod bert;
pub mod download;
pub mod table;

use std::path::PathBuf;
use thiserror::Error;

pub use bert::BertMaskedLm;
pub use table::TableMaskedLm;

#[derive(Error, Debug)]
pub enum MlmError {
    #[error("Model file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Invalid model config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("Mask token '{0}' is not in the tokenizer vocabulary")]
    MissingMaskToken(String),

    #[error("Expected exactly one mask token in the input, found {0}")]
    MaskCount(usize),

    #[error("Unknown device '{0}' (expected auto, cpu or cuda)")]
    UnknownDevice(String),

    #[error("Token id {0} is outside the model vocabulary")]
    TokenOutOfRange(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MlmError>;

/// A model that predicts the token hidden behind a mask.
pub trait MaskedLm: Send + Sync {
    /// Text of the mask token, as it must appear in a masked sentence
    fn mask_token(&self) -> &str;

    /// Probability of every vocabulary token at the single mask position
    fn mask_distribution(&self, masked_sentence: &str) -> Result<Vec<f32>>;

    /// Token ids of `word`, without special tokens
    fn word_token_ids(&self, word: &str) -> Result<Vec<u32>>;

    /// Text of a single token, trimmed
    fn decode_token(&self, id: u32) -> Result<String>;
}

impl<M: MaskedLm + ?Sized> MaskedLm for Box<M> {
    fn mask_token(&self) -> &str {
        (**self).mask_token()
    }

    fn mask_distribution(&self, masked_sentence: &str) -> Result<Vec<f32>> {
        (**self).mask_distribution(masked_sentence)
    }

    fn word_token_ids(&self, word: &str) -> Result<Vec<u32>> {
        (**self).word_token_ids(word)
    }

    fn decode_token(&self, id: u32) -> Result<String> {
        (**self).decode_token(id)
    }
}

/// Indices of the `k` largest probabilities, highest first
pub fn top_k(probs: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = probs
        .iter()
        .enumerate()
        .map(|(id, &p)| (id as u32, p))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_orders_by_probability() {
        let probs = [0.1, 0.4, 0.05, 0.4, 0.05];
        assert_eq!(top_k(&probs, 3), vec![(1, 0.4), (3, 0.4), (0, 0.1)]);
        assert_eq!(top_k(&probs, 10).len(), 5);
        assert!(top_k(&[], 3).is_empty());
    }
}
