use super::normalize::normalize_char;
use anyhow::{bail, Result};
use std::ops::Range;

/// Split a sentence into words on any Unicode whitespace.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Byte ranges in the raw `line` of the words of `split_words(&preprocess(line))`
///
/// Each range runs from the first to the last character of a whitespace
/// separated piece that survives preprocessing. Pieces preprocessing empties
/// entirely get no range, so indices line up with the normalized words.
pub fn word_spans(line: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for (pos, ch) in line.char_indices() {
        if ch.is_whitespace() {
            spans.extend(current.take());
            continue;
        }
        if normalize_char(ch).is_none() {
            continue;
        }

        let end = pos + ch.len_utf8();
        match current.as_mut() {
            Some(span) => span.end = end,
            None => current = Some(pos..end),
        }
    }
    spans.extend(current);

    spans
}

/// Join `words` with single spaces, replacing the word at `index` by `mask_token`.
pub fn mask_word<S: AsRef<str>>(words: &[S], index: usize, mask_token: &str) -> Result<String> {
    if index >= words.len() {
        bail!(
            "Cannot mask word {}: sentence only has {} words",
            index,
            words.len()
        );
    }

    let masked: Vec<&str> = words
        .iter()
        .enumerate()
        .map(|(i, w)| if i == index { mask_token } else { w.as_ref() })
        .collect();

    Ok(masked.join(" "))
}

/// Build one masked sentence per index, all from the same uncorrected `text`.
pub fn generate_masked_sentences(
    text: &str,
    indices: &[usize],
    mask_token: &str,
) -> Result<Vec<String>> {
    let words = split_words(text);
    indices
        .iter()
        .map(|&idx| mask_word(&words, idx, mask_token))
        .collect()
}
