//! PDF backend: text layer extraction via pdfium.
//!
//! pdfium is loaded at runtime. `pdfium-auto` resolves the shared library
//! from `PDFIUM_LIB_PATH`, the per-user cache, or a one-off download.
//!
//! pdfium returns each page's text as hard-wrapped lines. [`reflow`] joins
//! them back into paragraphs: a blank line always ends a paragraph, and so
//! does a short line that ends a sentence.

use super::Backend;
use crate::config::ConversionConfig;
use crate::document::{Block, Document, DocumentMetadata, Inline};
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::SourceDocument;
use pdfium_render::prelude::*;
use tracing::{debug, info};

pub struct PdfBackend;

impl Backend for PdfBackend {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn accepts(&self, format: InputFormat) -> bool {
        format == InputFormat::Pdf
    }

    fn convert(
        &self,
        source: &SourceDocument,
        config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        let pdfium = bind()?;
        let password = config.password.as_deref();

        let document = pdfium
            .load_pdf_from_byte_vec(source.bytes.clone(), password)
            .map_err(|e| load_error(&source.origin, password.is_some(), e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let mut doc = Document::new();
        doc.metadata = read_metadata(&document, total_pages);

        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                doc.push(Block::PageBreak { page: index + 1 });
            }
            let text = page
                .text()
                .map_err(|e| Doc2MdError::CorruptPdf {
                    source_name: source.origin.clone(),
                    detail: format!("page {}: {:?}", index + 1, e),
                })?
                .all();

            let paragraphs = reflow(&text);
            debug!(
                "page {}: {} chars → {} paragraphs",
                index + 1,
                text.len(),
                paragraphs.len()
            );
            for para in paragraphs {
                doc.push(Block::Paragraph(vec![Inline::Text(para)]));
            }
        }

        Ok(doc)
    }
}

/// Bind to the pdfium shared library, downloading it on first use.
pub fn bind() -> Result<Pdfium, Doc2MdError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| Doc2MdError::PdfiumBindingFailed(e.to_string()))
}

fn load_error(source_name: &str, had_password: bool, e: PdfiumError) -> Doc2MdError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            Doc2MdError::WrongPassword {
                source_name: source_name.to_string(),
            }
        } else {
            Doc2MdError::PasswordRequired {
                source_name: source_name.to_string(),
            }
        }
    } else {
        Doc2MdError::CorruptPdf {
            source_name: source_name.to_string(),
            detail: err_str,
        }
    }
}

fn read_metadata(document: &PdfDocument<'_>, page_count: usize) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: Some(page_count),
    }
}

/// Rejoin hard-wrapped text-layer lines into paragraphs.
pub(crate) fn reflow(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let short = widest * 3 / 5;

    let mut out = Vec::new();
    let mut current = String::new();

    for line in lines {
        if line.is_empty() {
            flush(&mut out, &mut current);
            continue;
        }

        if current.is_empty() {
            current.push_str(line);
        } else if current.ends_with('-')
            && !current.ends_with(" -")
            && line.starts_with(|c: char| c.is_lowercase())
        {
            // "hyphen-\nated" → "hyphenated"
            current.pop();
            current.push_str(line);
        } else {
            current.push(' ');
            current.push_str(line);
        }

        let ends_sentence = line.ends_with(['.', '!', '?', ':']);
        if ends_sentence && line.chars().count() < short {
            flush(&mut out, &mut current);
        }
    }
    flush(&mut out, &mut current);
    out
}

fn flush(out: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        out.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflow_joins_wrapped_lines() {
        let text = "The quick brown fox jumps over the lazy\r\ndog and keeps running far away.\r\n";
        assert_eq!(
            reflow(text),
            vec!["The quick brown fox jumps over the lazy dog and keeps running far away."]
        );
    }

    #[test]
    fn reflow_breaks_on_short_sentence_end() {
        let text = "This first paragraph is long enough to set the width\n\
                    and it ends here.\n\
                    A second paragraph starts on the following line and\n\
                    carries on.";
        let paras = reflow(text);
        assert_eq!(paras.len(), 2, "got: {paras:?}");
        assert!(paras[0].ends_with("ends here."));
        assert!(paras[1].starts_with("A second"));
    }

    #[test]
    fn reflow_breaks_on_blank_lines_and_dehyphenates() {
        let text = "Perfor-\nmance numbers\n\nNext block";
        assert_eq!(reflow(text), vec!["Performance numbers", "Next block"]);
    }

    #[test]
    fn reflow_keeps_dash_ranges() {
        assert_eq!(reflow("pages 1 -\n2"), vec!["pages 1 - 2"]);
    }

    #[test]
    fn reflow_empty_page() {
        assert!(reflow("").is_empty());
        assert!(reflow("\n \n").is_empty());
    }

    /// Needs a real pdfium; set `PDFIUM_LIB_PATH` to run.
    #[test]
    fn corrupt_bytes_are_reported() {
        if std::env::var("PDFIUM_LIB_PATH").is_err() {
            eprintln!("SKIP: PDFIUM_LIB_PATH not set");
            return;
        }
        let src = SourceDocument::from_bytes("broken.pdf", b"%PDF-1.7\nnot really".to_vec());
        let err = PdfBackend
            .convert(&src, &ConversionConfig::default())
            .unwrap_err();
        assert!(
            matches!(err, Doc2MdError::CorruptPdf { .. }),
            "unexpected error: {err:?}"
        );
    }
}
