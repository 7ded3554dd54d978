//! Lemma extraction
//!
//! Turns free text into dictionary forms ("lemmas"), the keys of the inverted
//! index. Two modes are offered:
//!
//! - [`LemmaAnalyzer::lemma_frequencies`] counts every lemma in a page text
//! - [`LemmaAnalyzer::lemma_set`] collects the distinct lemmas of a query
//!
//! Both lowercase the text, replace every character outside the configured
//! [`Alphabet`] with whitespace, and drop words whose readings include a
//! grammatical particle (conjunction, preposition, interjection).
//!
//! The analyzer holds no mutable state and is shared across crawl tasks
//! behind an `Arc`.

pub mod morphology;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub use morphology::{DictionaryMorphology, Morphology};

/// Tags marking function words excluded from the index
const PARTICLE_TAGS: &[&str] = &["МЕЖД", "ПРЕДЛ", "СОЮЗ", "INTJ", "PREP", "CONJ"];

/// Letters that make up words of the indexed language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    #[default]
    Cyrillic,
    Latin,
}

impl Alphabet {
    /// Check a lowercase letter
    pub fn is_lowercase_letter(&self, c: char) -> bool {
        match self {
            Self::Cyrillic => matches!(c, 'а'..='я' | 'ё'),
            Self::Latin => c.is_ascii_lowercase(),
        }
    }

    /// Check a letter of either case
    pub fn is_letter(&self, c: char) -> bool {
        match self {
            Self::Cyrillic => matches!(c, 'а'..='я' | 'ё' | 'А'..='Я' | 'Ё'),
            Self::Latin => c.is_ascii_alphabetic(),
        }
    }
}

/// Text to lemma analyzer
#[derive(Clone)]
pub struct LemmaAnalyzer {
    morphology: Arc<dyn Morphology>,
    alphabet: Alphabet,
}

impl std::fmt::Debug for LemmaAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LemmaAnalyzer")
            .field("alphabet", &self.alphabet)
            .finish_non_exhaustive()
    }
}

impl LemmaAnalyzer {
    /// Create an analyzer over a morphology capability
    pub fn new(morphology: Arc<dyn Morphology>, alphabet: Alphabet) -> Self {
        Self {
            morphology,
            alphabet,
        }
    }

    /// The alphabet words are made of
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Count lemma occurrences in a text
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use sitesearch::lemma::{Alphabet, DictionaryMorphology, LemmaAnalyzer};
    ///
    /// let morphology = DictionaryMorphology::new()
    ///     .with_entry("кошка", "кошка", "С")
    ///     .with_entry("кошки", "кошка", "С")
    ///     .with_entry("и", "и", "СОЮЗ");
    /// let analyzer = LemmaAnalyzer::new(Arc::new(morphology), Alphabet::Cyrillic);
    ///
    /// let counts = analyzer.lemma_frequencies("Кошка и кошки!");
    /// assert_eq!(counts.get("кошка"), Some(&2));
    /// assert!(!counts.contains_key("и"));
    /// ```
    pub fn lemma_frequencies(&self, text: &str) -> HashMap<String, u32> {
        let mut lemmas = HashMap::new();
        for word in self.words(text) {
            if let Some(lemma) = self.lemma_of(&word) {
                *lemmas.entry(lemma).or_insert(0) += 1;
            }
        }
        lemmas
    }

    /// Collect the distinct lemmas of a text
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.words(text)
            .filter_map(|word| self.lemma_of(&word))
            .collect()
    }

    /// Lemma of a single word, `None` for particles and unknown words
    ///
    /// The word may be in any case; it is lowercased first.
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if word.is_empty() || self.is_particle(&word) {
            return None;
        }
        self.morphology.normal_forms(&word).into_iter().next()
    }

    /// Split text into lowercase words of the alphabet
    fn words(&self, text: &str) -> impl Iterator<Item = String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| {
                if self.alphabet.is_lowercase_letter(c) || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        cleaned
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn is_particle(&self, word: &str) -> bool {
        self.morphology
            .base_forms(word)
            .iter()
            .any(|base| is_particle_reading(base))
    }
}

/// Check the tag part of a `lemma|TAGS` reading for a particle tag
///
/// Only whole tags count, so a lemma that merely contains a tag name
/// ("союз", "международный") is not a particle.
fn is_particle_reading(reading: &str) -> bool {
    let tags = reading
        .split_once('|')
        .map_or(reading, |(_, tags)| tags)
        .to_uppercase();

    tags.split(|c: char| c.is_whitespace() || c == ',')
        .any(|tag| PARTICLE_TAGS.contains(&tag))
}
