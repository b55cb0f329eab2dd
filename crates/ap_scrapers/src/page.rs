use ap_core::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Web Page Analysis";

/// Subtrees dropped before reading the page text
const NOISE_SELECTOR: &str =
    "script, style, nav, footer, header, .nav, .navigation, .sidebar, .advertisement, .ads";

/// Candidate containers for the main text, the longest one wins
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".content",
    "main",
    ".main-content",
    "#content",
    ".story-body",
    ".article-body",
];

const MIN_CONTAINER_CHARS: usize = 200;
const MIN_CONTENT_CHARS: usize = 50;
const MIN_FALLBACK_CHARS: usize = 20;
const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStructure {
    pub sections: usize,
    pub tables: usize,
    pub images: usize,
    pub links: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub title: String,
    /// Empty when the page does not name one
    pub author: String,
    pub publish_date: String,
    pub content: String,
    pub structure: PageStructure,
}

impl ExtractedPage {
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    pub fn reading_time(&self) -> usize {
        reading_time(self.word_count())
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes at 200 words per minute, rounded up
pub fn reading_time(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector {}: {}", css, e)))
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .map(|el| element_text(&el).trim().to_string())
        .filter(|text| !text.is_empty()))
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// Text of every match, concatenated
fn all_text(document: &Html, css: &str) -> Result<String> {
    let selector = selector(css)?;
    Ok(document.select(&selector).map(|el| element_text(&el)).collect())
}

fn count(document: &Html, css: &str) -> Result<usize> {
    let selector = selector(css)?;
    Ok(document.select(&selector).count())
}

/// Trimmed texts of the first `limit` matches, joined with spaces
fn joined_texts(document: &Html, css: &str, limit: usize) -> Result<String> {
    let selector = selector(css)?;
    let texts: Vec<String> = document
        .select(&selector)
        .take(limit)
        .map(|el| element_text(&el).trim().to_string())
        .collect();
    Ok(texts.join(" ").trim().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Copy of the document without the noise subtrees.
///
/// Detached nodes stay in the arena and `Html::select` still walks them, so
/// the pruned tree is serialized and parsed again.
fn without_noise(document: &Html) -> Result<Html> {
    let noise = selector(NOISE_SELECTOR)?;
    let mut pruned = document.clone();
    let ids: Vec<_> = pruned.select(&noise).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = pruned.tree.get_mut(id) {
            node.detach();
        }
    }
    Ok(Html::parse_document(&pruned.html()))
}

fn main_content(document: &Html) -> Result<String> {
    let mut content = String::new();
    for css in CONTENT_SELECTORS {
        let text = all_text(document, css)?;
        let text = text.trim();
        if text.len() > content.len() {
            content = text.to_string();
        }
    }

    if content.chars().count() < MIN_CONTAINER_CHARS {
        content = all_text(document, "body")?.trim().to_string();
    }
    Ok(collapse_whitespace(&content))
}

fn fallback_content(document: &Html) -> Result<Option<String>> {
    for (css, limit) in [("p", usize::MAX), ("div", 10), ("span", 20)] {
        let text = joined_texts(document, css, limit)?;
        if !text.is_empty() {
            return Ok(Some(text).filter(|t| t.chars().count() > MIN_FALLBACK_CHARS));
        }
    }
    Ok(None)
}

/// Pull the readable parts out of a web page.
///
/// Metadata is read from the untouched document. Navigation, scripts, ads
/// and similar chrome are then dropped before counting structure and
/// picking the main text: the longest known article container, or the
/// whole body when no container holds enough text. Pages that still yield
/// almost nothing fall back to paragraph/div/span texts, then to the title.
pub fn extract_page(html: &str, url: &str) -> Result<ExtractedPage> {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title")?
        .or(first_text(&document, "h1")?)
        .or(first_attr(&document, r#"meta[property="og:title"]"#, "content")?)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let author = first_attr(&document, r#"meta[name="author"]"#, "content")?
        .or(first_attr(&document, r#"meta[property="article:author"]"#, "content")?)
        .or(first_text(&document, ".author")?)
        .unwrap_or_default();

    let publish_date = first_attr(&document, r#"meta[property="article:published_time"]"#, "content")?
        .or(first_attr(&document, r#"meta[name="date"]"#, "content")?)
        .or(first_attr(&document, "time", "datetime")?)
        .or(first_text(&document, ".date")?)
        .unwrap_or_default();

    let document = without_noise(&document)?;

    let mut content = main_content(&document)?;

    let structure = PageStructure {
        sections: count(&document, "h1, h2, h3, h4, h5, h6")?,
        tables: count(&document, "table")?,
        images: count(&document, "img")?,
        links: count(&document, "a[href]")?,
    };

    if content.chars().count() < MIN_CONTENT_CHARS {
        content = match fallback_content(&document)? {
            Some(text) => text,
            None if !title.is_empty() => title.clone(),
            None => url.to_string(),
        };
    }

    tracing::debug!(
        url,
        title = %title,
        chars = content.len(),
        sections = structure.sections,
        "page extracted"
    );

    Ok(ExtractedPage {
        title,
        author,
        publish_date,
        content,
        structure,
    })
}
