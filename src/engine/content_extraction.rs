//! Content extraction functionality for the fetch engine

use std::collections::{BTreeMap, HashSet};

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use crate::engine::error::EngineError;

/// Elements that never carry readable content
pub const NON_CONTENT_SELECTORS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "template", "link", "meta",
];

/// Metadata and references extracted from a page's HTML
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Title of the page
    pub title: Option<String>,

    /// Description of the page
    pub description: Option<String>,

    /// Keywords of the page
    pub keywords: Option<String>,

    /// Author of the page
    pub author: Option<String>,

    /// Document language from `<html lang>`
    pub language: Option<String>,

    /// Every named `<meta>` tag, keys lowercased
    pub metadata: BTreeMap<String, String>,

    /// Absolute http(s) link targets, deduplicated in document order
    pub links: Vec<String>,

    /// Absolute media sources, deduplicated in document order
    pub media: Vec<String>,
}

impl ExtractedPage {
    /// The meta map with the resolved description, keywords, author and
    /// language written over the raw tags
    pub fn merged_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = self.metadata.clone();
        let resolved = [
            ("description", &self.description),
            ("keywords", &self.keywords),
            ("author", &self.author),
            ("language", &self.language),
        ];
        for (key, value) in resolved {
            if let Some(value) = value {
                metadata.insert(key.to_string(), value.clone());
            }
        }
        metadata
    }
}

fn selector(css: &str) -> Result<Selector, EngineError> {
    Selector::parse(css)
        .map_err(|e| EngineError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

/// Clean HTML by removing elements matching the given selectors
///
/// # Arguments
///
/// * `html` - The HTML to clean
/// * `exclude_selectors` - CSS selectors for elements to remove
///
/// # Returns
///
/// The cleaned HTML as a string
pub fn clean_html(html: &str, exclude_selectors: &[&str]) -> String {
    let mut document = Html::parse_document(html);

    let mut doomed = Vec::new();
    for css in exclude_selectors {
        match Selector::parse(css) {
            Ok(selector) => doomed.extend(document.select(&selector).map(|element| element.id())),
            Err(e) => warn!("Failed to parse selector '{}': {:?}", css, e),
        }
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.html()
}

/// Extract metadata, links and media from a page
///
/// # Arguments
///
/// * `url` - The URL of the page, used to resolve relative references
/// * `html` - The HTML of the page
pub fn extract_metadata(url: &str, html: &str) -> Result<ExtractedPage, EngineError> {
    let document = Html::parse_document(html);
    let base = Url::parse(url)?;

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let mut metadata = BTreeMap::new();
    for element in document.select(&selector("meta[content]")?) {
        let attrs = element.value();
        let key = attrs
            .attr("name")
            .or_else(|| attrs.attr("property"))
            .or_else(|| attrs.attr("http-equiv"));
        if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
            metadata
                .entry(key.trim().to_lowercase())
                .or_insert_with(|| content.trim().to_string());
        }
    }

    let language = document
        .select(&selector("html[lang]")?)
        .next()
        .and_then(|element| element.value().attr("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty());

    let description = metadata
        .get("description")
        .or_else(|| metadata.get("og:description"))
        .cloned();
    let keywords = metadata.get("keywords").cloned();
    let author = metadata.get("author").cloned();

    let links = collect_references(&document, &base, "a[href]", "href")?
        .into_iter()
        .filter(|link| link.starts_with("http://") || link.starts_with("https://"))
        .collect();
    let media = collect_references(
        &document,
        &base,
        "img[src], video[src], audio[src], source[src]",
        "src",
    )?;

    Ok(ExtractedPage {
        title,
        description,
        keywords,
        author,
        language,
        metadata,
        links,
        media,
    })
}

fn collect_references(
    document: &Html,
    base: &Url,
    css: &str,
    attr: &str,
) -> Result<Vec<String>, EngineError> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for element in document.select(&selector(css)?) {
        let Some(raw) = element.value().attr(attr) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
            continue;
        }
        let Ok(mut resolved) = base.join(raw) else {
            continue;
        };
        resolved.set_fragment(None);
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            references.push(resolved);
        }
    }

    Ok(references)
}

/// Drop Markdown paragraphs with fewer than `threshold` words
///
/// Headings, list items, quotes, tables, images and fenced code are always
/// kept. A threshold of 0 returns the input unchanged.
pub fn apply_word_threshold(markdown: &str, threshold: usize) -> String {
    if threshold == 0 {
        return markdown.to_string();
    }

    let mut kept: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_fence = false;

    let flush = |paragraph: &mut Vec<&str>, kept: &mut Vec<String>| {
        if paragraph.is_empty() {
            return;
        }
        let block = paragraph.join("\n");
        if is_structural(&block) || block.split_whitespace().count() >= threshold {
            kept.push(block);
        }
        paragraph.clear();
    };

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            paragraph.push(line);
            continue;
        }
        if line.trim().is_empty() && !in_fence {
            flush(&mut paragraph, &mut kept);
            continue;
        }
        paragraph.push(line);
    }
    flush(&mut paragraph, &mut kept);

    kept.join("\n\n")
}

fn is_structural(block: &str) -> bool {
    let first = block.trim_start();
    if first.starts_with("```") {
        return true;
    }
    if ["#", "- ", "* ", "+ ", ">", "|", "!["]
        .iter()
        .any(|marker| first.starts_with(marker))
    {
        return true;
    }
    // Ordered list items: "1. ", "12) "
    let digits = first.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && matches!(first[digits..].chars().next(), Some('.') | Some(')'))
}
