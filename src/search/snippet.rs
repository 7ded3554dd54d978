//! Highlighted snippets
//!
//! A snippet starts at the first word whose lemma is part of the query and
//! runs on through the page text until the length cap would be exceeded.
//! Matching words are wrapped in `<b>…</b>`; all other text is HTML-escaped.

use std::collections::HashSet;

use crate::lemma::{Alphabet, LemmaAnalyzer};

/// Split text into runs of alphabet letters, with their byte offsets
fn word_runs(text: &str, alphabet: Alphabet) -> Vec<(usize, &str)> {
    let mut runs = Vec::new();
    let mut start = None;

    for (idx, c) in text.char_indices() {
        match (alphabet.is_letter(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                runs.push((s, &text[s..idx]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, &text[s..]));
    }
    runs
}

/// Build a snippet of at most `max_len` visible characters
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use std::sync::Arc;
/// use sitesearch::lemma::{Alphabet, DictionaryMorphology, LemmaAnalyzer};
/// use sitesearch::search::snippet::build_snippet;
///
/// let morphology = DictionaryMorphology::new().with_entry("кошка", "кот", "С");
/// let analyzer = LemmaAnalyzer::new(Arc::new(morphology), Alphabet::Cyrillic);
/// let lemmas: HashSet<String> = ["кот".to_string()].into();
///
/// let snippet = build_snippet("Вот кошка спит", &lemmas, &analyzer, 160);
/// assert_eq!(snippet, "<b>кошка</b> спит");
/// ```
pub fn build_snippet(
    text: &str,
    query_lemmas: &HashSet<String>,
    analyzer: &LemmaAnalyzer,
    max_len: usize,
) -> String {
    let mut snippet = String::new();
    let mut visible = 0;
    // byte offset just past the last emitted word; None until the first match
    let mut cursor: Option<usize> = None;

    for (start, word) in word_runs(text, analyzer.alphabet()) {
        let is_match = analyzer
            .lemma_of(word)
            .is_some_and(|lemma| query_lemmas.contains(&lemma));

        let gap = match cursor {
            Some(from) => &text[from..start],
            None if is_match => "",
            None => continue,
        };

        let added = gap.chars().count() + word.chars().count();
        if visible + added > max_len {
            break;
        }

        snippet.push_str(&html_escape::encode_text(gap));
        if is_match {
            snippet.push_str("<b>");
            snippet.push_str(&html_escape::encode_text(word));
            snippet.push_str("</b>");
        } else {
            snippet.push_str(&html_escape::encode_text(word));
        }

        visible += added;
        cursor = Some(start + word.len());
    }

    snippet
}
