//! Accent-insensitive normalization and keyword matching
//!
//! All matching in the rule evaluator goes through [`normalize`], so
//! "Félïz", "FELIZ" and "feliz" are the same word.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Words that count as naming an emotion
pub static EMOTION_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new([
        "feliz",
        "triste",
        "ansioso",
        "enojado",
        "emocionado",
        "calmado",
        "agradecido",
        "estresado",
        "nervioso",
        "motivado",
        "contento",
        "frustrado",
        "confundido",
        "aliviado",
    ])
});

/// Words that signal a reflective message
pub static REFLECTION_KEYWORDS: Lazy<KeywordSet> = Lazy::new(|| {
    KeywordSet::new([
        "reflexion",
        "reflexionar",
        "aprendi",
        "aprendizaje",
        "pienso",
        "pense",
        "entiendo",
        "comprendi",
        "descubri",
        "note",
        "valoro",
        "agradezco",
        "proposito",
        "meta",
        "crecer",
        "mejorar",
        "cambiar",
        "habito",
    ])
});

// Spanish alphabet after accent folding.
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zñ]+").expect("valid word pattern"));

/// Lower-case `text` and strip Unicode combining marks
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Split `text` into normalized word tokens. Digits and punctuation are
/// separators, never tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    WORD.find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A fixed vocabulary of normalized words
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    words: HashSet<String>,
}

impl KeywordSet {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| normalize(w.as_ref()).trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// True if any token is in the set
    pub fn contains_any<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        tokens.iter().any(|t| self.contains(t.as_ref()))
    }

    /// The distinct set members present in `tokens`
    pub fn hits<'a, S: AsRef<str>>(&'a self, tokens: &[S]) -> BTreeSet<&'a str> {
        tokens
            .iter()
            .filter_map(|t| self.words.get(t.as_ref()).map(String::as_str))
            .collect()
    }
}

/// True if normalized `haystack` contains any of the (already normalized)
/// phrases. Empty phrases never match.
pub fn contains_any_phrase<S: AsRef<str>>(haystack: &str, phrases: &[S]) -> bool {
    phrases
        .iter()
        .map(AsRef::as_ref)
        .any(|p| !p.trim().is_empty() && haystack.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_accents() {
        assert_eq!(normalize("Hoy me siento MUY Feliz"), normalize("hoy me siento muy feliz"));
        assert_eq!(normalize("Feliz"), normalize("félïz"));
        assert_eq!(normalize("Reflexión"), "reflexion");
        assert_eq!(normalize("Año"), "ano");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_tokenize_skips_numbers_and_punctuation() {
        assert_eq!(
            tokenize("¡Hoy, 3 veces: feliz... y CALMADO!"),
            vec!["hoy", "veces", "feliz", "y", "calmado"]
        );
        assert!(tokenize("42 !!! ...").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_emotion_hit_counted_once_regardless_of_case() {
        let upper = tokenize("Hoy me siento MUY Feliz");
        let lower = tokenize("hoy me siento muy feliz");
        assert_eq!(upper, lower);

        let hits = EMOTION_KEYWORDS.hits(&upper);
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec!["feliz"]);
    }

    #[test]
    fn test_hits_are_distinct() {
        let tokens = tokenize("feliz feliz triste FELIZ");
        assert_eq!(EMOTION_KEYWORDS.hits(&tokens).len(), 2);
        assert!(EMOTION_KEYWORDS.contains_any(&tokens));
        assert!(!REFLECTION_KEYWORDS.contains_any(&tokens));
    }

    #[test]
    fn test_keyword_set_normalizes_entries() {
        let set = KeywordSet::new(["Respiración", "", "  "]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("respiracion"));
    }

    #[test]
    fn test_empty_phrase_never_matches() {
        assert!(!contains_any_phrase("respiracion consciente", &["", " "]));
        assert!(contains_any_phrase("respiracion consciente", &["", "respira"]));
    }
}
