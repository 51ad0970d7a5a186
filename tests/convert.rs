//! Integration tests for doc2md: convert real files into a scratch output
//! directory and check what lands on disk.
//!
//! PDF tests need a pdfium library and only run when `PDFIUM_LIB_PATH` is
//! set:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test convert -- --nocapture

use doc2md::{
    convert, convert_to_dir, Backend, ConversionConfig, ConversionRequest, Doc2MdError, Document,
    DocumentConverter, InputFormat, SourceDocument,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Quarterly Report</title><style>h1 { color: red }</style></head>
<body>
<h1>Quarterly Report</h1>
<p>Revenue grew <b>12%</b> over the quarter.</p>
<script>console.log("tracking")</script>
</body>
</html>"#;

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn minimal_docx() -> Vec<u8> {
    let document = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Minutes</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Attendees were </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>present</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>Item</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Owner</w:t></w:r></w:p></w:tc></w:tr>
      <w:tr><w:tc><w:p><w:r><w:t>Budget</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Ana</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
    <w:sectPr/>
  </w:body>
</w:document>"#;

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let opts = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", opts).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file("word/document.xml", opts).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

/// Backend that always fails, for checking nothing is written on error.
struct Broken;

impl Backend for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn accepts(&self, _format: InputFormat) -> bool {
        true
    }
    fn convert(
        &self,
        source: &SourceDocument,
        _config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        Err(Doc2MdError::ConversionFailed {
            backend: "broken",
            source_name: source.origin.clone(),
            detail: "simulated parser crash".into(),
        })
    }
}

// ── Output naming and placement ──────────────────────────────────────────────

#[tokio::test]
async fn html_report_lands_in_converted_dir() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "report.html", REPORT_HTML.as_bytes());
    let out_dir = tmp.path().join("converted");

    let saved = convert_to_dir(
        source.to_string_lossy(),
        &out_dir,
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(saved.path, out_dir.canonicalize().unwrap().join("report.md"));
    let md = std::fs::read_to_string(&saved.path).unwrap();
    assert!(md.contains("Quarterly Report"), "got: {md}");
    assert!(md.contains("12%"), "got: {md}");
    assert!(!md.contains("tracking"), "script leaked: {md}");
    assert!(!md.contains("color: red"), "style leaked: {md}");
    assert!(md.ends_with('\n'));
    assert_eq!(saved.stats.format, Some(InputFormat::Html));
    assert_eq!(saved.stats.output_bytes, md.len());
}

#[tokio::test]
async fn source_without_extension_becomes_output_md() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "NOTES", b"just some notes\n\nsecond paragraph\n");
    let out_dir = tmp.path().join("out");

    let saved = convert_to_dir(
        source.to_string_lossy(),
        &out_dir,
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(saved.path.file_name().unwrap(), "output.md");
    assert_eq!(
        std::fs::read_to_string(&saved.path).unwrap(),
        "just some notes\n\nsecond paragraph\n"
    );
}

#[tokio::test]
async fn second_run_overwrites_silently() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "report.txt", b"first version");
    let out_dir = tmp.path().join("converted");
    let config = ConversionConfig::default();

    convert_to_dir(source.to_string_lossy(), &out_dir, &config)
        .await
        .unwrap();
    std::fs::write(&source, "second version").unwrap();
    let saved = convert_to_dir(source.to_string_lossy(), &out_dir, &config)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&saved.path).unwrap(), "second version\n");
    assert_eq!(files_in(&out_dir), vec!["report.md"]);
}

#[tokio::test]
async fn missing_nested_out_dir_is_created() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "readme.md", b"# Hello\n");
    let out_dir = tmp.path().join("a").join("b").join("c");
    assert!(!out_dir.exists());

    let saved = convert_to_dir(
        source.to_string_lossy(),
        &out_dir,
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert!(out_dir.is_dir());
    assert_eq!(std::fs::read_to_string(saved.path).unwrap(), "# Hello\n");
}

// ── Failure behaviour ────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_conversion_leaves_no_file() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "report.html", REPORT_HTML.as_bytes());
    let out_dir = tmp.path().join("converted");

    let converter = DocumentConverter::default().with_backend(Arc::new(Broken));
    let request = ConversionRequest::new(source.to_string_lossy(), &out_dir);
    let err = converter.convert_request(&request).await.unwrap_err();

    assert!(err.to_string().contains("simulated parser crash"), "got: {err}");
    assert!(err.is_conversion_failure());
    // The directory is prepared up front, but stays empty.
    assert!(out_dir.is_dir());
    assert!(files_in(&out_dir).is_empty());
}

#[tokio::test]
async fn failed_conversion_keeps_previous_output() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "report.html", REPORT_HTML.as_bytes());
    let out_dir = tmp.path().join("converted");
    std::fs::create_dir_all(&out_dir).unwrap();
    write_file(&out_dir, "report.md", b"previous run\n");

    let converter = DocumentConverter::default().with_backend(Arc::new(Broken));
    let request = ConversionRequest::new(source.to_string_lossy(), &out_dir);
    converter.convert_request(&request).await.unwrap_err();

    assert_eq!(
        std::fs::read_to_string(out_dir.join("report.md")).unwrap(),
        "previous run\n"
    );
}

#[tokio::test]
async fn missing_source_reports_file_not_found() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("converted");
    let missing = tmp.path().join("nope.html");

    let err = convert_to_dir(
        missing.to_string_lossy(),
        &out_dir,
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Doc2MdError::FileNotFound { .. }), "got {err:?}");
    assert!(files_in(&out_dir).is_empty());
}

#[tokio::test]
async fn directory_source_is_invalid_input() {
    let tmp = TempDir::new().unwrap();
    let err = convert(tmp.path().to_string_lossy(), &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Doc2MdError::InvalidInput { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_url_is_download_failure() {
    let config = ConversionConfig::builder()
        .download_timeout_secs(2)
        .build()
        .unwrap();
    // Port 9 (discard) on localhost is closed on any sane test machine.
    let err = convert("http://127.0.0.1:9/doc", &config).await.unwrap_err();
    assert!(
        matches!(
            err,
            Doc2MdError::DownloadFailed { .. } | Doc2MdError::DownloadTimeout { .. }
        ),
        "got {err:?}"
    );
}

// ── Formats ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn docx_file_converts_to_structured_markdown() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "minutes.docx", &minimal_docx());

    let out = convert(source.to_string_lossy(), &ConversionConfig::default())
        .await
        .unwrap();

    assert_eq!(out.format, InputFormat::Docx);
    assert_eq!(
        out.markdown,
        "# Minutes\n\nAttendees were *present*.\n\n| Item | Owner |\n| --- | --- |\n| Budget | Ana |\n"
    );
}

#[tokio::test]
async fn docx_is_detected_without_extension() {
    let out = DocumentConverter::default()
        .convert_bytes("upload", minimal_docx())
        .await
        .unwrap();
    assert_eq!(out.format, InputFormat::Docx);
}

#[tokio::test]
async fn html_is_sniffed_without_extension() {
    let out = DocumentConverter::default()
        .convert_bytes("page", REPORT_HTML.as_bytes().to_vec())
        .await
        .unwrap();
    assert_eq!(out.format, InputFormat::Html);
    assert_eq!(out.document.metadata.title.as_deref(), Some("Quarterly Report"));
}

#[test]
fn sync_wrapper_converts_text() {
    let tmp = TempDir::new().unwrap();
    let source = write_file(tmp.path(), "a.txt", b"line one\nline two\n");
    let out = doc2md::convert_sync(source.to_string_lossy(), &ConversionConfig::default())
        .unwrap();
    assert_eq!(out.markdown, "line one line two\n");
}

#[tokio::test]
async fn pdf_without_pdfium_is_skipped_or_reports_corruption() {
    if std::env::var("PDFIUM_LIB_PATH").is_err() {
        println!("SKIP — set PDFIUM_LIB_PATH to run PDF tests");
        return;
    }
    let err = DocumentConverter::default()
        .convert_bytes("broken.pdf", b"%PDF-1.4\ngarbage".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, Doc2MdError::CorruptPdf { .. }), "got {err:?}");
}
