//! String tokenizers used by the term and full-text match functions.

use graphlet_common::utils::hash::FxHashSet;

/// English stop words dropped by the full-text tokenizer.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Splits a string into lower-cased alphanumeric terms, in order of first
/// appearance, without duplicates.
#[must_use]
pub fn terms(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Full-text tokens: terms with stop words removed and a light suffix
/// stemming applied.
#[must_use]
pub fn fulltext(text: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    terms(text)
        .into_iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .map(|t| stem(&t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Strips common English inflections.
fn stem(term: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(root) = term.strip_suffix(suffix) {
            if root.chars().count() >= 3 {
                return root.to_string();
            }
        }
    }
    term.to_string()
}

/// Returns true if every needle token appears among the haystack tokens.
#[must_use]
pub fn contains_all(haystack: &[String], needles: &[String]) -> bool {
    !needles.is_empty() && needles.iter().all(|n| haystack.contains(n))
}

/// Returns true if any needle token appears among the haystack tokens.
#[must_use]
pub fn contains_any(haystack: &[String], needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms() {
        assert_eq!(terms("Hello, hello World!"), vec!["hello", "world"]);
        assert!(terms("  ").is_empty());
    }

    #[test]
    fn test_fulltext_drops_stop_words_and_stems() {
        assert_eq!(fulltext("The dogs are running"), vec!["dog", "runn"]);
        assert_eq!(fulltext("a cat"), vec!["cat"]);
    }

    #[test]
    fn test_matching() {
        let hay = terms("quick brown fox");
        assert!(contains_all(&hay, &terms("fox quick")));
        assert!(!contains_all(&hay, &terms("fox dog")));
        assert!(contains_any(&hay, &terms("fox dog")));
        assert!(!contains_all(&hay, &[]));
    }
}
