//! Script-based language detection for English/Kannada text.

use crate::domain::Language;

/// Minimum share of alphabetic characters that must be Kannada script for a
/// text to count as Kannada.
pub const KANNADA_MIN_SHARE: f32 = 0.5;

fn is_kannada_char(ch: char) -> bool {
    ('\u{0C80}'..='\u{0CFF}').contains(&ch)
}

/// Share of alphabetic characters in the Kannada block, `None` when the text
/// has no letters at all.
pub fn kannada_share(text: &str) -> Option<f32> {
    let mut letters = 0usize;
    let mut kannada = 0usize;
    for ch in text.chars() {
        if is_kannada_char(ch) {
            // Kannada vowel signs are not `is_alphabetic` in every Unicode
            // version; count the whole block.
            letters += 1;
            kannada += 1;
        } else if ch.is_alphabetic() {
            letters += 1;
        }
    }
    if letters == 0 {
        return None;
    }
    Some(kannada as f32 / letters as f32)
}

pub fn detect_language(text: &str) -> Language {
    match kannada_share(text) {
        Some(share) if share >= KANNADA_MIN_SHARE => Language::Kannada,
        _ => Language::English,
    }
}

/// Whether `text` is predominantly written in the script of `language`.
/// Text without letters only counts as English.
pub fn matches_language(text: &str, language: Language) -> bool {
    let share = kannada_share(text);
    match language {
        Language::English => !matches!(share, Some(s) if s >= KANNADA_MIN_SHARE),
        Language::Kannada => matches!(share, Some(s) if s >= KANNADA_MIN_SHARE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_scripts() {
        assert_eq!(detect_language("Land revenue act"), Language::English);
        assert_eq!(detect_language("ಭೂ ಕಂದಾಯ ಕಾಯ್ದೆ"), Language::Kannada);
        assert_eq!(detect_language("1964 - 12"), Language::English);
    }

    #[test]
    fn kannada_answers_must_be_in_kannada_script() {
        assert!(matches_language("ಕರ್ನಾಟಕ ಭೂ ಸುಧಾರಣೆ ಕಾಯ್ದೆ 1961", Language::Kannada));
        assert!(!matches_language("The Karnataka Land Reforms Act", Language::Kannada));
        assert!(!matches_language("", Language::Kannada));
    }

    #[test]
    fn english_answers_must_not_be_kannada_script() {
        assert!(matches_language("The Karnataka Land Reforms Act", Language::English));
        assert!(matches_language("Section 79A, 1961", Language::English));
        assert!(matches_language("1961", Language::English));
        assert!(!matches_language("ಕರ್ನಾಟಕ ಭೂ ಸುಧಾರಣೆ ಕಾಯ್ದೆ", Language::English));
    }
}
