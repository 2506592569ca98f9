//! Deterministic masked LM backed by a lookup table.
//!
//! Each known masked sentence maps to a fixed distribution; any other
//! sentence gets a uniform one. Used by the test suite and benchmarks
//! where loading real weights is not an option.

use super::{MaskedLm, MlmError, Result};
use std::collections::HashMap;

pub struct TableMaskedLm {
    mask_token: String,
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    predictions: HashMap<String, Vec<f32>>,
}

impl TableMaskedLm {
    /// Create a model whose vocabulary is `tokens`, in id order
    pub fn new<I, S>(mask_token: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();

        Self {
            mask_token: mask_token.to_string(),
            tokens,
            ids,
            predictions: HashMap::new(),
        }
    }

    /// Fix the distribution for `masked_sentence`
    ///
    /// Listed tokens get the given probability; the remaining mass is
    /// spread evenly over the other tokens. Unknown tokens are ignored.
    pub fn with_prediction(mut self, masked_sentence: &str, probs: &[(&str, f32)]) -> Self {
        let mut dist = vec![0.0f32; self.tokens.len()];
        let mut assigned = 0.0f32;
        let mut fixed = vec![false; self.tokens.len()];

        for &(token, p) in probs {
            if let Some(&id) = self.ids.get(token) {
                dist[id as usize] = p;
                fixed[id as usize] = true;
                assigned += p;
            }
        }

        let free = fixed.iter().filter(|f| !**f).count();
        if free > 0 {
            let rest = (1.0 - assigned).max(0.0) / free as f32;
            for (p, is_fixed) in dist.iter_mut().zip(&fixed) {
                if !is_fixed {
                    *p = rest;
                }
            }
        }

        self.predictions.insert(masked_sentence.to_string(), dist);
        self
    }

    fn count_masks(&self, sentence: &str) -> usize {
        sentence
            .split_whitespace()
            .filter(|w| *w == self.mask_token)
            .count()
    }
}

impl MaskedLm for TableMaskedLm {
    fn mask_token(&self) -> &str {
        &self.mask_token
    }

    fn mask_distribution(&self, masked_sentence: &str) -> Result<Vec<f32>> {
        let masks = self.count_masks(masked_sentence);
        if masks != 1 {
            return Err(MlmError::MaskCount(masks));
        }

        if let Some(dist) = self.predictions.get(masked_sentence) {
            return Ok(dist.clone());
        }

        let n = self.tokens.len().max(1);
        Ok(vec![1.0 / n as f32; self.tokens.len()])
    }

    fn word_token_ids(&self, word: &str) -> Result<Vec<u32>> {
        Ok(self.ids.get(word).map(|&id| vec![id]).unwrap_or_default())
    }

    fn decode_token(&self, id: u32) -> Result<String> {
        self.tokens
            .get(id as usize)
            .map(|t| t.trim().to_string())
            .ok_or(MlmError::TokenOutOfRange(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TableMaskedLm {
        TableMaskedLm::new("[MASK]", ["[MASK]", "[UNK]", "كتاب", "قلم"])
            .with_prediction("اشتريت [MASK]", &[("كتاب", 0.7), ("قلم", 0.2)])
    }

    #[test]
    fn test_fixed_prediction() {
        let dist = model().mask_distribution("اشتريت [MASK]").unwrap();
        assert_eq!(dist.len(), 4);
        assert!((dist[2] - 0.7).abs() < 1e-6);
        assert!((dist[0] - 0.05).abs() < 1e-6);
        assert!((dist.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_sentence_is_uniform() {
        let dist = model().mask_distribution("[MASK] جديد").unwrap();
        assert!(dist.iter().all(|p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_mask_count_is_checked() {
        let m = model();
        assert!(matches!(m.mask_distribution("لا قناع"), Err(MlmError::MaskCount(0))));
        assert!(matches!(
            m.mask_distribution("[MASK] [MASK]"),
            Err(MlmError::MaskCount(2))
        ));
    }

    #[test]
    fn test_word_ids_and_decode() {
        let m = model();
        assert_eq!(m.word_token_ids("قلم").unwrap(), vec![3]);
        assert!(m.word_token_ids("غريب").unwrap().is_empty());
        assert_eq!(m.decode_token(2).unwrap(), "كتاب");
        assert!(m.decode_token(9).is_err());
    }
}
