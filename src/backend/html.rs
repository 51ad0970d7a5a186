//! HTML backend.
//!
//! The page body goes through `html2md`. Non-content elements are stripped
//! first because `html2md` renders their text verbatim.

use super::Backend;
use crate::config::ConversionConfig;
use crate::document::{Block, Document};
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::SourceDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

pub struct HtmlBackend;

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());

static RE_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\s+name\s*=\s*["'](author|description)["']\s+content\s*=\s*["']([^"']*)["']"#)
        .unwrap()
});

static RE_NON_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template|head)\b[^>]*>.*?</(script|style|noscript|template|head)\s*>")
        .unwrap()
});

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

impl Backend for HtmlBackend {
    fn name(&self) -> &'static str {
        "html"
    }

    fn accepts(&self, format: InputFormat) -> bool {
        format == InputFormat::Html
    }

    fn convert(
        &self,
        source: &SourceDocument,
        _config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        let html = source.text();
        let mut doc = Document::new();

        doc.metadata.title = RE_TITLE
            .captures(&html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty());
        for caps in RE_META.captures_iter(&html) {
            let value = decode_entities(caps[2].trim());
            if value.is_empty() {
                continue;
            }
            match caps[1].to_ascii_lowercase().as_str() {
                "author" => doc.metadata.author = Some(value),
                _ => doc.metadata.subject = Some(value),
            }
        }

        let body = strip_non_content(&html);
        let markdown = html2md::parse_html(&body);
        debug!(
            "html2md produced {} bytes from {} bytes of HTML",
            markdown.len(),
            html.len()
        );

        if !markdown.trim().is_empty() {
            doc.push(Block::Markdown(markdown));
        }
        Ok(doc)
    }
}

/// Remove comments and elements whose text is never part of the document.
fn strip_non_content(html: &str) -> String {
    let without_comments = RE_COMMENT.replace_all(html, "");
    RE_NON_CONTENT.replace_all(&without_comments, "").into_owned()
}

/// Decode the handful of entities that show up in titles and meta tags.
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
