//! Format backends: one per supported input format.
//!
//! A backend turns a [`SourceDocument`] into a [`Document`]. Backends are
//! synchronous; the converter runs them on tokio's blocking pool because
//! some of them (pdfium in particular) do heavy CPU work or hold
//! thread-local state.
//!
//! ```text
//! SourceDocument ──▶ Backend::convert ──▶ Document ──▶ export_to_markdown
//! ```
//!
//! 1. [`text`]: plain text and Markdown passthrough
//! 2. [`html`]: HTML via `html2md`
//! 3. [`docx`]: Word documents (ZIP + WordprocessingML)
//! 4. [`pdf`]: PDF text layer via pdfium

pub mod docx;
pub mod html;
pub mod pdf;
pub mod text;

use crate::config::ConversionConfig;
use crate::document::Document;
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::SourceDocument;
use std::sync::Arc;

/// Converts one input format into the shared [`Document`] model.
pub trait Backend: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Whether this backend handles `format`.
    fn accepts(&self, format: InputFormat) -> bool;

    /// Convert the source. Errors should name the backend and the source.
    fn convert(
        &self,
        source: &SourceDocument,
        config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError>;
}

/// The built-in backends, one for every [`InputFormat`].
pub fn default_backends() -> Vec<Arc<dyn Backend>> {
    vec![
        Arc::new(text::TextBackend),
        Arc::new(text::MarkdownBackend),
        Arc::new(html::HtmlBackend),
        Arc::new(docx::DocxBackend),
        Arc::new(pdf::PdfBackend),
    ]
}
