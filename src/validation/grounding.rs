//! Hallucination check: are extracted claims anchored in the source text?

use std::collections::{HashMap, HashSet};

/// Characters of a claim that must appear verbatim to count as quoted.
const QUOTE_PREFIX_CHARS: usize = 50;

/// The `limit` most frequent words of at least `min_len` characters.
///
/// Ties are broken alphabetically so the set is deterministic.
pub fn key_terms(source: &str, limit: usize, min_len: usize) -> HashSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in words(source) {
        if word.chars().count() >= min_len {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

/// Fraction of claims that share a key term with the source or quote it.
///
/// No claims means nothing can be ungrounded: the ratio is 1.
pub fn grounding_ratio<'a, I>(claims: I, source: &str, terms: &HashSet<String>) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let source_lower = source.to_lowercase();
    let mut total = 0usize;
    let mut grounded = 0usize;

    for claim in claims {
        total += 1;
        if is_grounded(claim, &source_lower, terms) {
            grounded += 1;
        }
    }

    if total == 0 {
        1.0
    } else {
        grounded as f64 / total as f64
    }
}

fn is_grounded(claim: &str, source_lower: &str, terms: &HashSet<String>) -> bool {
    // Substring match so inflected forms ("transformers") still share the term.
    let claim_lower = claim.to_lowercase();
    if terms.iter().any(|term| claim_lower.contains(term.as_str())) {
        return true;
    }

    let prefix: String = claim_lower.trim().chars().take(QUOTE_PREFIX_CHARS).collect();
    !prefix.is_empty() && source_lower.contains(&prefix)
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_terms_by_frequency() {
        let source = "Scaling scaling scaling transformer transformer attention models are big";
        let terms = key_terms(source, 2, 6);

        assert_eq!(terms.len(), 2);
        assert!(terms.contains("scaling"));
        assert!(terms.contains("transformer"));
        assert!(!terms.contains("models"));
    }

    #[test]
    fn test_short_words_ignored() {
        let terms = key_terms("data data data is big", 50, 6);
        assert!(terms.is_empty());
    }

    #[test]
    fn test_unrelated_claim_is_ungrounded() {
        let source = "This paper studies transformer scaling laws.";
        let terms = key_terms(source, 50, 6);

        let ratio = grounding_ratio(["The dataset lacks diversity in robotics tasks"], source, &terms);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_shared_term_grounds_claim() {
        let source = "This paper studies transformer scaling laws.";
        let terms = key_terms(source, 50, 6);

        let ratio = grounding_ratio(
            [
                "Scaling behaviour beyond 10B parameters is untested",
                "The dataset lacks diversity in robotics tasks",
            ],
            source,
            &terms,
        );
        assert_eq!(ratio, 0.5);
    }

    #[test]
    fn test_plural_form_shares_term() {
        let source = "Transformer models scale predictably. Our transformer experiments are English only.";
        let terms = key_terms(source, 50, 6);

        let ratio = grounding_ratio(["Transformers trained on code are not studied"], source, &terms);
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_verbatim_quote_grounds_claim() {
        let source = "We note that the low recall on rare classes remains open.";
        // Empty term set forces the quote path.
        let ratio = grounding_ratio(["The low recall on rare classes remains open"], source, &HashSet::new());
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_no_claims() {
        assert_eq!(grounding_ratio(std::iter::empty(), "anything", &HashSet::new()), 1.0);
    }
}
