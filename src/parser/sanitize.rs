//! Text sanitization utilities for cleaning extracted page text
//!
//! Visible text feeds both the lemma analyzer and the snippet builder, so it
//! is reduced to single-spaced plain text without invisible characters.

use crate::utils::normalize_whitespace;

/// Sanitize extracted text content
///
/// This function applies multiple cleaning steps:
/// 1. Remove zero-width characters
/// 2. Remove control characters (except newline/tab)
/// 3. Collapse all whitespace runs to a single space
///
/// # Examples
///
/// ```
/// use sitesearch::parser::sanitize::sanitize_text;
///
/// let dirty = "Привет\u{200B}мир  \n\n\n\nтест";
/// assert_eq!(sanitize_text(dirty), "Приветмир тест");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let result = remove_zero_width(text);
    let result = remove_control_chars(&result);
    normalize_whitespace(&result)
}

/// Remove zero-width spaces and similar invisible characters
///
/// Removes:
/// - \u{200B}-\u{200F} zero-width space, joiners and direction marks
/// - \u{2028}-\u{202F} separators and formatting characters
/// - \u{FEFF} Byte order mark (BOM)
///
/// # Examples
///
/// ```
/// use sitesearch::parser::sanitize::remove_zero_width;
///
/// assert_eq!(remove_zero_width("ко\u{200B}т\u{FEFF}"), "кот");
/// ```
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2028}'..='\u{202F}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
