//! What the user asked for: one source, one output directory.

use crate::pipeline::input::{is_url, url_file_name};
use std::path::{Path, PathBuf};

/// Source used when none is given on the command line or in the environment.
pub const DEFAULT_SOURCE: &str = "input.html";

/// Output directory used when none is given.
pub const DEFAULT_OUT_DIR: &str = "converted";

/// Output file name for sources without an extension.
pub const FALLBACK_FILE_NAME: &str = "output.md";

/// A single conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Local path or `http(s)://` URL.
    pub source: String,
    /// Output directory as given; resolved (and created) at write time.
    pub out_dir: PathBuf,
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE, DEFAULT_OUT_DIR)
    }
}

impl ConversionRequest {
    pub fn new(source: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Name of the Markdown file this request produces.
    ///
    /// `<stem>.md` when the source has a non-empty final extension,
    /// otherwise [`FALLBACK_FILE_NAME`]. Only the last suffix is replaced:
    /// `archive.tar.gz` becomes `archive.tar.md`.
    pub fn output_file_name(&self) -> String {
        output_file_name(&self.source)
    }

    /// Full output path inside an already-resolved directory.
    pub fn output_path(&self, resolved_dir: &Path) -> PathBuf {
        resolved_dir.join(self.output_file_name())
    }
}

/// Derive the output file name for `source`. See
/// [`ConversionRequest::output_file_name`].
pub fn output_file_name(source: &str) -> String {
    let name = if is_url(source) {
        reqwest::Url::parse(source)
            .ok()
            .and_then(|u| url_file_name(&u))
    } else {
        Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    };

    name.as_deref()
        .and_then(stem_with_extension)
        .map(|stem| format!("{stem}.md"))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

/// The stem of `file_name` if it has a non-empty extension.
fn stem_with_extension(file_name: &str) -> Option<&str> {
    let path = Path::new(file_name);
    let ext = path.extension()?;
    if ext.is_empty() {
        return None;
    }
    // `extension()` ignores a leading dot, so ".bashrc" has none.
    let stem = path.file_stem()?.to_str()?;
    Some(stem)
}
