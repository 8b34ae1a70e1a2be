//! Restricted-word scanning.
//!
//! Absolute qualifiers ("apenas", "somente", ...) make distractors trivially
//! identifiable. Matches are reported as observations and never rewrite the
//! scanned text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Restricted words and phrases used when no `stopwords.txt` is supplied.
pub const DEFAULT_RESTRICTED_WORDS: &[&str] = &[
    "limita-se",
    "estritamente",
    "apenas",
    "exclusivamente",
    "somente",
    "unicamente",
    "restritivamente",
    "rigorosamente",
    "especificamente",
    "exatamente",
    "precisamente",
    "unilateralmente",
    "singularmente",
    "determinadamente",
    "explicitamente",
    "meramente",
    "unicidade",
    "nada além de",
    "só isso",
    "e somente isso",
    "de forma exclusiva",
    "de modo restrito",
    "de maneira limitada",
    "sem exceções",
];

/// One occurrence of a restricted word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedMatch {
    /// The restricted word as configured.
    pub word: String,
    /// Character offset of the occurrence in the scanned text.
    pub position: usize,
}

/// Returns the default restricted-word list as owned strings.
pub fn default_restricted_words() -> Vec<String> {
    DEFAULT_RESTRICTED_WORDS
        .iter()
        .map(|w| (*w).to_string())
        .collect()
}

/// Finds every case-insensitive, whole-word occurrence of each word in `text`.
///
/// Phrases match across any run of whitespace. Matches are ordered by
/// position, then by word. Empty words are ignored.
pub fn find_restricted_words<S: AsRef<str>>(text: &str, words: &[S]) -> Vec<RestrictedMatch> {
    let mut matches = Vec::new();

    for word in words {
        let word = word.as_ref().trim();
        if word.is_empty() {
            continue;
        }
        let pattern = match word_regex(word) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!(word = %word, error = %e, "Skipping unusable restricted word");
                continue;
            }
        };
        for found in pattern.find_iter(text) {
            matches.push(RestrictedMatch {
                word: word.to_string(),
                position: text[..found.start()].chars().count(),
            });
        }
    }

    matches.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.word.cmp(&b.word)));
    matches
}

fn word_regex(word: &str) -> Result<Regex, regex::Error> {
    let body = word
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let leading = if word.starts_with(char::is_alphanumeric) { r"\b" } else { "" };
    let trailing = if word.ends_with(char::is_alphanumeric) { r"\b" } else { "" };
    Regex::new(&format!("(?i){}{}{}", leading, body, trailing))
}

/// Distinct matched words in first-occurrence order.
pub fn distinct_words(matches: &[RestrictedMatch]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for m in matches {
        if !seen.contains(&m.word) {
            seen.push(m.word.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_case_insensitive_matches() {
        let matches = find_restricted_words("Apenas A e somente B. APENAS isso.", &["apenas", "somente"]);
        let words: Vec<&str> = matches.iter().map(|m| m.word.as_str()).collect();
        assert_eq!(words, vec!["apenas", "somente", "apenas"]);
        assert_eq!(matches[0].position, 0);
    }

    #[test]
    fn test_multi_word_phrase() {
        let matches = find_restricted_words("Vale para todos, sem exceções.", DEFAULT_RESTRICTED_WORDS);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].word, "sem exceções");
    }

    #[test]
    fn test_word_inside_longer_word_is_not_flagged() {
        let matches = find_restricted_words("O valor foi estimado imprecisamente.", DEFAULT_RESTRICTED_WORDS);
        assert!(matches.is_empty(), "unexpected matches: {:?}", matches);
    }

    #[test]
    fn test_positions_are_character_offsets() {
        let matches = find_restricted_words("Média é precisamente 5.", &["precisamente"]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 8);
    }

    #[test]
    fn test_phrase_matches_across_line_break() {
        let matches = find_restricted_words("Vale para todos, sem\nexceções.", &["sem exceções"]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 17);
    }

    #[test]
    fn test_accented_uppercase_matches() {
        let matches = find_restricted_words("SÓ ISSO basta.", &["só isso"]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 0);
    }

    #[test]
    fn test_no_match() {
        assert!(find_restricted_words("Texto neutro.", DEFAULT_RESTRICTED_WORDS).is_empty());
    }

    #[test]
    fn test_empty_word_ignored() {
        assert!(find_restricted_words("qualquer", &["", "  "]).is_empty());
    }

    #[test]
    fn test_input_not_modified_and_pure() {
        let text = String::from("Somente hoje");
        let first = find_restricted_words(&text, &["somente"]);
        let second = find_restricted_words(&text, &["somente"]);
        assert_eq!(first, second);
        assert_eq!(text, "Somente hoje");
    }

    #[test]
    fn test_distinct_words() {
        let matches = find_restricted_words("apenas apenas somente", &["apenas", "somente"]);
        assert_eq!(distinct_words(&matches), vec!["apenas", "somente"]);
    }

    #[test]
    fn test_default_list_nonempty() {
        assert_eq!(default_restricted_words().len(), DEFAULT_RESTRICTED_WORDS.len());
    }
}
