use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

use crate::dictionary::EntityDictionary;

/// Canonical topic label
pub type Entity = String;

/// Phrases this short only match as whole words
const SHORT_FORM_MAX_LEN: usize = 3;

enum Phrase {
    WholeWord(Regex),
    Substring(String),
}

impl Phrase {
    fn compile(form: &str) -> Result<Self> {
        let form = form.to_lowercase();
        if form.chars().count() <= SHORT_FORM_MAX_LEN {
            let pattern = format!(r"\b{}\b", regex::escape(&form));
            let regex = Regex::new(&pattern)
                .with_context(|| format!("Failed to compile pattern for '{}'", form))?;
            Ok(Phrase::WholeWord(regex))
        } else {
            Ok(Phrase::Substring(form))
        }
    }

    fn is_match(&self, lowered: &str) -> bool {
        match self {
            Phrase::WholeWord(regex) => regex.is_match(lowered),
            Phrase::Substring(form) => lowered.contains(form.as_str()),
        }
    }
}

/// Case-insensitive matcher for a list of phrases.
///
/// Short phrases ("ai", "ml") need a word boundary on both sides so they do
/// not fire inside longer words ("air", "html"); longer phrases match as a
/// plain substring.
pub struct PhraseMatcher<T> {
    phrases: Vec<(Phrase, T)>,
}

impl<T> PhraseMatcher<T> {
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let phrases = entries
            .into_iter()
            .map(|(form, value)| Ok((Phrase::compile(form.as_ref())?, value)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { phrases })
    }

    /// Values of every phrase found in `text`
    pub fn matches<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a T> + 'a {
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .filter(move |(phrase, _)| phrase.is_match(&lowered))
            .map(|(_, value)| value)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matches(text).next().is_some()
    }
}

/// Maps free text to a set of canonical topic labels
pub struct EntityExtractor {
    known: PhraseMatcher<Entity>,
    proper_noun: Regex,
    stop_words: BTreeSet<String>,
}

impl EntityExtractor {
    pub fn new(dictionary: &EntityDictionary) -> Result<Self> {
        let known = PhraseMatcher::new(
            dictionary
                .entities
                .iter()
                .map(|(form, label)| (form.as_str(), label.clone())),
        )
        .context("Failed to build entity matcher")?;

        // One or more consecutive capitalised words: "Sam Altman", "Moltbook"
        let proper_noun = Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b")
            .context("Failed to compile proper noun pattern")?;

        Ok(Self {
            known,
            proper_noun,
            stop_words: dictionary.stop_words.clone(),
        })
    }

    pub fn extract(&self, text: &str) -> BTreeSet<Entity> {
        if text.is_empty() {
            return BTreeSet::new();
        }

        let mut found: BTreeSet<Entity> = self.known.matches(text).cloned().collect();

        for capture in self.proper_noun.find_iter(text) {
            let noun = capture.as_str();
            if noun.len() > SHORT_FORM_MAX_LEN && !self.stop_words.contains(&noun.to_lowercase()) {
                found.insert(noun.to_string());
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(entries: &[(&str, &str)]) -> EntityExtractor {
        let dict = EntityDictionary::with_entities(entries.iter().copied());
        EntityExtractor::new(&dict).unwrap()
    }

    fn default_extractor() -> EntityExtractor {
        EntityExtractor::new(&EntityDictionary::default()).unwrap()
    }

    // ==================== Dictionary Matching Tests ====================

    #[test]
    fn test_short_form_requires_word_boundary() {
        let ex = extractor(&[("ai", "AI")]);
        assert!(!ex.extract("aircraft").contains("AI"));
        assert!(ex.extract("I love AI").contains("AI"));
        assert!(ex.extract("ai-powered search").contains("AI"));
    }

    #[test]
    fn test_long_form_matches_anywhere() {
        let ex = extractor(&[("openai", "OpenAI")]);
        assert!(ex.extract("the OpenAIs of the world").contains("OpenAI"));
        assert!(ex.extract("OPENAI ships").contains("OpenAI"));
    }

    #[test]
    fn test_surface_forms_collapse_to_one_label() {
        let ex = default_extractor();
        let entities = ex.extract("karpathy and Andrej Karpathy agree");
        assert_eq!(
            entities.iter().filter(|e| e.as_str() == "Andrej Karpathy").count(),
            1
        );
    }

    #[test]
    fn test_xai_does_not_trigger_ai() {
        let ex = extractor(&[("ai", "AI"), ("xai", "xAI")]);
        let entities = ex.extract("xai raised money");
        assert!(entities.contains("xAI"));
        assert!(!entities.contains("AI"));
    }

    // ==================== Proper Noun Tests ====================

    #[test]
    fn test_proper_noun_sequences_become_entities() {
        let ex = extractor(&[]);
        let entities = ex.extract("Moltbook launched yesterday with Boris Cherny");
        assert_eq!(entities.len(), 2);
        assert!(entities.contains("Moltbook"));
        assert!(entities.contains("Boris Cherny"));
    }

    #[test]
    fn test_proper_noun_stop_words_and_short_words_skipped() {
        let ex = default_extractor();
        let entities = ex.extract("The deal: Meta and Sora");
        assert!(!entities.contains("The"));
        assert!(entities.contains("Meta"));
        assert!(entities.contains("Sora"));

        let bare = extractor(&[]);
        assert!(bare.extract("Big Tom").contains("Big Tom"));
        assert!(bare.extract("Tom ran").is_empty());
    }

    #[test]
    fn test_single_stop_word_is_skipped() {
        let ex = default_extractor();
        assert!(!ex.extract("Which model wins").contains("Which"));
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_empty_text_yields_empty_set() {
        assert!(default_extractor().extract("").is_empty());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let ex = default_extractor();
        let text = "OpenAI and Anthropic discuss AI Safety with Sam Altman";
        assert_eq!(ex.extract(text), ex.extract(text));
    }

    #[test]
    fn test_phrase_matcher_is_match() {
        let matcher = PhraseMatcher::new([("llm", ()), ("machine learning", ())]).unwrap();
        assert!(matcher.is_match("A new LLM benchmark"));
        assert!(matcher.is_match("Machine Learning at scale"));
        assert!(!matcher.is_match("llama farms"));
    }
}
