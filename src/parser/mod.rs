//! HTML parsing and data extraction
//!
//! Extracts what the indexer and the search engine need from a fetched page:
//! the `<title>`, the visible text, and the absolute hyperlinks.

pub mod sanitize;

use scraper::{Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

use sanitize::sanitize_text;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements rendered as their own block; text on either side is separate
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "dialog",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "html", "li", "main", "nav", "ol", "option", "p", "pre",
    "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void elements that break a line of text
const BREAK_ELEMENTS: &[&str] = &["br", "hr", "img"];

/// Parsed HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlPage {
    /// Text of the `<title>` element, empty when missing
    pub title: String,

    /// Visible text, whitespace-collapsed
    pub text: String,

    /// Hyperlinks resolved against the page URL, in document order
    pub links: Vec<Url>,
}

impl HtmlPage {
    /// Parse a page fetched from `base`
    pub fn parse(html: &str, base: &Url) -> Self {
        let document = Html::parse_document(html);
        Self {
            title: title_of(&document),
            text: visible_text_of(&document),
            links: links_of(&document, base),
        }
    }

    /// Parse stored page content; links are not extracted
    pub fn parse_content(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            title: title_of(&document),
            text: visible_text_of(&document),
            links: Vec::new(),
        }
    }
}

/// Extract the page title
///
/// # Examples
///
/// ```
/// use sitesearch::parser::title;
///
/// assert_eq!(title("<html><head><title> Кошки </title></head></html>"), "Кошки");
/// ```
pub fn title(html: &str) -> String {
    title_of(&Html::parse_document(html))
}

/// Extract the text a reader sees, without scripts and styles
pub fn visible_text(html: &str) -> String {
    visible_text_of(&Html::parse_document(html))
}

/// Extract absolute hyperlinks
pub fn links(html: &str, base: &Url) -> Vec<Url> {
    links_of(&Html::parse_document(html), base)
}

fn title_of(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| sanitize_text(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Text nodes are concatenated as rendered: inline markup adds no space,
/// a change of enclosing block or a line break does.
fn visible_text_of(document: &Html) -> String {
    let mut text = String::new();
    let mut current_block = None;
    let mut line_break = false;

    for node in document.root_element().descendants() {
        match node.value() {
            Node::Element(el) if BREAK_ELEMENTS.contains(&el.name()) => line_break = true,
            Node::Text(fragment) => {
                let enclosing: Vec<_> = node
                    .ancestors()
                    .filter_map(|ancestor| {
                        ancestor.value().as_element().map(|el| (ancestor.id(), el.name()))
                    })
                    .collect();
                if enclosing.iter().any(|(_, name)| HIDDEN_ELEMENTS.contains(name)) {
                    continue;
                }

                let block = enclosing
                    .iter()
                    .find(|(_, name)| BLOCK_ELEMENTS.contains(name))
                    .map(|(id, _)| *id);
                if line_break || block != current_block {
                    text.push(' ');
                }
                line_break = false;
                current_block = block;
                text.push_str(fragment);
            }
            _ => {}
        }
    }

    sanitize_text(&text)
}

fn links_of(document: &Html, base: &Url) -> Vec<Url> {
    document
        .select(&LINK_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| base.join(href).ok())
        .collect()
}
