//! Plain-text and Markdown backends.

use super::Backend;
use crate::config::ConversionConfig;
use crate::document::{Block, Document, Inline};
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::SourceDocument;

/// Plain text: blank-line separated paragraphs.
pub struct TextBackend;

impl Backend for TextBackend {
    fn name(&self) -> &'static str {
        "text"
    }

    fn accepts(&self, format: InputFormat) -> bool {
        format == InputFormat::Text
    }

    fn convert(
        &self,
        source: &SourceDocument,
        _config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        let mut doc = Document::new();
        for para in paragraphs(&source.text()) {
            doc.push(Block::Paragraph(vec![Inline::Text(para)]));
        }
        Ok(doc)
    }
}

/// Markdown: passed through unchanged; the first level-1 heading becomes the
/// title.
pub struct MarkdownBackend;

impl Backend for MarkdownBackend {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn accepts(&self, format: InputFormat) -> bool {
        format == InputFormat::Markdown
    }

    fn convert(
        &self,
        source: &SourceDocument,
        _config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        let text = source.text();
        let mut doc = Document::new();
        doc.metadata.title = text
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        doc.push(Block::Markdown(text));
        Ok(doc)
    }
}

/// Split text into paragraphs on blank lines, joining wrapped lines with a
/// single space.
pub(crate) fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}
