/// Letters of the Arabic alphabet kept by [`preprocess`].
const LETTERS: &str = "ابتثجحخدذرزسشصضطظعغفقكلمنهويءئؤىة";

/// Short vowels, tanween, shadda, sukun and the dagger alef.
const DIACRITICS: &str = "\u{064B}\u{064C}\u{064D}\u{064E}\u{064F}\u{0650}\u{0651}\u{0652}\u{0670}";

const DIGITS: &str = "0123456789";

const PUNCTUATION: &str = ".,!؟؛،";

/// Returns true when `ch` survives preprocessing.
pub fn is_allowed(ch: char) -> bool {
    ch.is_whitespace()
        || LETTERS.contains(ch)
        || DIACRITICS.contains(ch)
        || DIGITS.contains(ch)
        || PUNCTUATION.contains(ch)
}

/// Fold the hamza-carrying alef forms (أ إ آ) into a bare alef.
fn fold_alef(ch: char) -> char {
    match ch {
        'أ' | 'إ' | 'آ' => 'ا',
        other => other,
    }
}

/// What preprocessing turns `ch` into, or `None` when it is dropped.
pub fn normalize_char(ch: char) -> Option<char> {
    let ch = fold_alef(ch);
    is_allowed(ch).then_some(ch)
}

/// Normalize Arabic text before it reaches the vocabulary or the model.
///
/// Alef variants are folded first, then every character outside the
/// allow-list is dropped. Whitespace is kept as-is so callers can still
/// split lines and words afterwards.
pub fn preprocess(text: &str) -> String {
    text.chars().filter_map(normalize_char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alef_variants_are_folded() {
        assert_eq!(preprocess("أحمد إلى آخر"), "احمد الى اخر");
    }

    #[test]
    fn test_foreign_characters_are_dropped() {
        assert_eq!(preprocess("مرحبا hello 123!"), "مرحبا  123!");
        assert_eq!(preprocess("كتـــاب"), "كتاب"); // tatweel
        assert_eq!(preprocess("گچپ"), "");
    }

    #[test]
    fn test_diacritics_and_punctuation_survive() {
        let text = "كَتَبَ، الوَلَدُ؟ نعم؛ 42.";
        assert_eq!(preprocess(text), text);
    }

    #[test]
    fn test_whitespace_is_preserved() {
        assert_eq!(preprocess("سلام\tعليكم\nيا صديقي"), "سلام\tعليكم\nيا صديقي");
    }

    #[test]
    fn test_idempotent() {
        let once = preprocess("أهلاً وسهلاً ya friend 🙂 بكم");
        assert_eq!(preprocess(&once), once);
    }
}
