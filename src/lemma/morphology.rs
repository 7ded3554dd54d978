//! Morphological analysis capability
//!
//! The lemma analyzer only needs two questions answered about a word: which
//! grammatical readings it has, and which dictionary forms it normalizes to.
//! [`Morphology`] is that seam; [`DictionaryMorphology`] answers it from a
//! word-form dictionary.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Morphological analysis for one natural language
pub trait Morphology: Send + Sync {
    /// Grammatical readings of a lowercase word, as `lemma|TAGS` strings
    fn base_forms(&self, word: &str) -> Vec<String>;

    /// Dictionary forms of a lowercase word, most likely first
    fn normal_forms(&self, word: &str) -> Vec<String>;
}

/// One reading of a word form
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reading {
    normal_form: String,
    tags: String,
}

/// Dictionary-backed morphology
///
/// The dictionary file is tab separated, one reading per line:
///
/// ```text
/// # form    lemma   tags
/// кошки     кошка   С жр,ед,рд
/// и         и       СОЮЗ
/// ```
///
/// Lines starting with `#` and blank lines are ignored. The tag column is
/// optional.
#[derive(Debug, Clone, Default)]
pub struct DictionaryMorphology {
    readings: HashMap<String, Vec<Reading>>,
    keep_unknown_words: bool,
}

impl DictionaryMorphology {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dictionary from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read morphology dictionary: {}", path.display()))?;

        let dictionary = Self::parse(&content)
            .with_context(|| format!("Failed to parse morphology dictionary: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            forms = dictionary.len(),
            "Morphology dictionary loaded"
        );
        Ok(dictionary)
    }

    /// Parse dictionary text
    pub fn parse(content: &str) -> Result<Self> {
        let mut dictionary = Self::new();

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let mut columns = line.split('\t');
            let form = columns.next().unwrap_or_default().trim();
            let lemma = columns
                .next()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .with_context(|| format!("line {}: missing lemma column", idx + 1))?;
            let tags = columns.next().unwrap_or_default().trim();

            if form.is_empty() {
                anyhow::bail!("line {}: empty word form", idx + 1);
            }
            dictionary.insert(form, lemma, tags);
        }

        Ok(dictionary)
    }

    /// Add a reading; forms and lemmas are stored lowercase
    pub fn insert(&mut self, form: &str, normal_form: &str, tags: &str) {
        self.readings
            .entry(form.to_lowercase())
            .or_default()
            .push(Reading {
                normal_form: normal_form.to_lowercase(),
                tags: tags.to_string(),
            });
    }

    /// Builder-style [`insert`](Self::insert)
    #[must_use]
    pub fn with_entry(mut self, form: &str, normal_form: &str, tags: &str) -> Self {
        self.insert(form, normal_form, tags);
        self
    }

    /// Treat words missing from the dictionary as their own normal form
    #[must_use]
    pub fn with_unknown_words(mut self, keep: bool) -> Self {
        self.keep_unknown_words = keep;
        self
    }

    /// Number of distinct word forms
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Check if the dictionary has no forms
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl Morphology for DictionaryMorphology {
    fn base_forms(&self, word: &str) -> Vec<String> {
        match self.readings.get(word) {
            Some(readings) => readings
                .iter()
                .map(|r| format!("{}|{}", r.normal_form, r.tags))
                .collect(),
            None if self.keep_unknown_words => vec![format!("{word}|")],
            None => Vec::new(),
        }
    }

    fn normal_forms(&self, word: &str) -> Vec<String> {
        match self.readings.get(word) {
            Some(readings) => {
                let mut forms: Vec<String> = Vec::with_capacity(readings.len());
                for reading in readings {
                    if !forms.contains(&reading.normal_form) {
                        forms.push(reading.normal_form.clone());
                    }
                }
                forms
            }
            None if self.keep_unknown_words => vec![word.to_string()],
            None => Vec::new(),
        }
    }
}
