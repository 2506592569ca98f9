pub mod files;

use crate::config::Config;
use crate::mlm::{self, MaskedLm};
use crate::text::{generate_masked_sentences, mask_word, preprocess, split_words, word_spans};
use crate::vocab::Vocabulary;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, warn};

lazy_static! {
    static ref DEFAULT_CANDIDATE_RE: Regex =
        Regex::new(crate::config::DEFAULT_CANDIDATE_PATTERN).unwrap();
}

#[derive(Debug, Clone)]
pub struct CorrectorOptions {
    /// Out-of-vocabulary words scoring below this are misspelled
    pub threshold: f32,
    /// Number of model predictions inspected per misspelling
    pub top_k: usize,
    /// Predictions must match this to be used as a replacement
    pub candidate_pattern: Regex,
    /// Replacement used when none of the top-k predictions match
    pub fallback_token: String,
}

impl CorrectorOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let candidate_pattern = Regex::new(&config.candidate_pattern)
            .with_context(|| format!("Invalid candidate pattern: {}", config.candidate_pattern))?;

        Ok(Self {
            threshold: config.threshold,
            top_k: config.top_k,
            candidate_pattern,
            fallback_token: config.fallback_token.clone(),
        })
    }
}

impl Default for CorrectorOptions {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            top_k: 5,
            candidate_pattern: DEFAULT_CANDIDATE_RE.clone(),
            fallback_token: "[UNK]".to_string(),
        }
    }
}

/// One replaced word
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    /// Position of the word in the normalized sentence
    pub index: usize,
    pub original: String,
    pub replacement: String,
    /// Every matching prediction, most probable first
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionReport {
    /// Input after preprocessing
    pub normalized: String,
    pub corrected: String,
    pub corrections: Vec<Correction>,
}

impl CorrectionReport {
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Rebuild the sentence, asking `choose` what to write for each correction
    ///
    /// `None` keeps the original word. A report without corrections renders
    /// as the normalized text, untouched.
    pub fn render_with<F>(&self, mut choose: F) -> String
    where
        F: FnMut(&Correction) -> Option<String>,
    {
        if self.corrections.is_empty() {
            return self.normalized.clone();
        }

        let mut words: Vec<String> = split_words(&self.normalized)
            .into_iter()
            .map(str::to_string)
            .collect();

        for correction in &self.corrections {
            if let Some(word) = choose(correction) {
                if let Some(slot) = words.get_mut(correction.index) {
                    *slot = word;
                }
            }
        }

        words.join(" ")
    }

    /// Apply the chosen replacements to `line`, the raw text this report was built from
    ///
    /// `choose` is called once per correction, in order; `None` keeps the
    /// word. Only the spans of replaced words change, so characters that
    /// preprocessing would drop are written back byte for byte.
    pub fn apply_to<F>(&self, line: &str, mut choose: F) -> String
    where
        F: FnMut(&Correction) -> Option<String>,
    {
        let spans = word_spans(line);
        let mut fixed = String::with_capacity(line.len());
        let mut last = 0;

        for correction in &self.corrections {
            let Some(word) = choose(correction) else {
                continue;
            };
            let Some(span) = spans.get(correction.index) else {
                continue;
            };
            if span.start < last {
                continue;
            }

            fixed.push_str(&line[last..span.start]);
            fixed.push_str(&word);
            last = span.end;
        }
        fixed.push_str(&line[last..]);

        fixed
    }
}

/// Vocabulary lookup plus masked-LM scoring and replacement.
pub struct Corrector<M> {
    vocab: Vocabulary,
    model: M,
    options: CorrectorOptions,
}

impl<M: MaskedLm> Corrector<M> {
    pub fn new(vocab: Vocabulary, model: M, options: CorrectorOptions) -> Self {
        Self {
            vocab,
            model,
            options,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> &CorrectorOptions {
        &self.options
    }

    /// Probability the model gives `words[index]` when it is masked out
    ///
    /// Words split into several tokens score the mean of their token
    /// probabilities; a word with no tokens scores 0.
    pub fn word_probability(&self, words: &[&str], index: usize) -> Result<f32> {
        let word = words
            .get(index)
            .with_context(|| format!("Word index {} out of range", index))?;

        let token_ids = self.model.word_token_ids(word)?;
        if token_ids.is_empty() {
            return Ok(0.0);
        }

        let masked = mask_word(words, index, self.model.mask_token())?;
        let probs = self.model.mask_distribution(&masked)?;

        let sum: f32 = token_ids
            .iter()
            .map(|&id| probs.get(id as usize).copied().unwrap_or(0.0))
            .sum();

        Ok(sum / token_ids.len() as f32)
    }

    /// Indices of the words of `text` that look misspelled, in ascending order
    ///
    /// Words present in the vocabulary are accepted without asking the model.
    pub fn find_misspellings(&self, text: &str) -> Result<Vec<usize>> {
        let words = split_words(text);
        let mut misspelled = Vec::new();

        for (i, word) in words.iter().enumerate() {
            if self.vocab.contains(word) {
                continue;
            }

            let prob = self.word_probability(&words, i)?;
            debug!(word, index = i, prob, "scored out-of-vocabulary word");

            if prob < self.options.threshold {
                misspelled.push(i);
            }
        }

        Ok(misspelled)
    }

    /// Top-k predictions for the mask that match the candidate pattern
    pub fn candidates(&self, masked_sentence: &str) -> Result<Vec<String>> {
        let probs = self.model.mask_distribution(masked_sentence)?;

        let mut candidates = Vec::new();
        for (id, _) in mlm::top_k(&probs, self.options.top_k) {
            let token = self.model.decode_token(id)?;
            // distinct ids can decode to the same text; keep the most probable
            if self.options.candidate_pattern.is_match(&token) && !candidates.contains(&token) {
                candidates.push(token);
            }
        }

        Ok(candidates)
    }

    /// Most probable matching replacement, or the fallback token
    pub fn predict(&self, masked_sentence: &str) -> Result<String> {
        Ok(self
            .candidates(masked_sentence)?
            .into_iter()
            .next()
            .unwrap_or_else(|| self.options.fallback_token.clone()))
    }

    /// Run the whole pipeline on one sentence
    pub fn correct(&self, text: &str) -> Result<CorrectionReport> {
        let normalized = preprocess(text);
        let misspelled = self.find_misspellings(&normalized)?;

        if misspelled.is_empty() {
            return Ok(CorrectionReport {
                corrected: normalized.clone(),
                normalized,
                corrections: Vec::new(),
            });
        }

        // Every mask is built from the uncorrected sentence
        let masked = generate_masked_sentences(&normalized, &misspelled, self.model.mask_token())?;
        let words = split_words(&normalized);

        let mut corrections = Vec::with_capacity(misspelled.len());
        for (&index, sentence) in misspelled.iter().zip(&masked) {
            let candidates = self.candidates(sentence)?;
            let replacement = match candidates.first() {
                Some(best) => best.clone(),
                None => {
                    warn!(word = words[index], "no candidate matched, using fallback token");
                    self.options.fallback_token.clone()
                }
            };

            corrections.push(Correction {
                index,
                original: words[index].to_string(),
                replacement,
                candidates,
            });
        }

        let mut report = CorrectionReport {
            normalized,
            corrected: String::new(),
            corrections,
        };
        report.corrected = report.render_with(|c| Some(c.replacement.clone()));

        Ok(report)
    }

    /// Correct each line of `content` independently, one report per line
    pub fn correct_lines(&self, content: &str) -> Result<Vec<CorrectionReport>> {
        let lines: Vec<&str> = content.lines().collect();
        lines.par_iter().map(|line| self.correct(line)).collect()
    }
}
