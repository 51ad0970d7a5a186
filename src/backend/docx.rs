//! Word (DOCX) backend.
//!
//! A DOCX file is a ZIP archive of XML parts. Four of them matter here:
//!
//! | Part | Used for |
//! |------|----------|
//! | `word/document.xml` | body: paragraphs, runs, tables, hyperlinks |
//! | `word/styles.xml` | style id → name, so localised heading ids resolve |
//! | `word/numbering.xml` | whether a list level is numbered or bulleted |
//! | `word/_rels/document.xml.rels` | hyperlink targets |
//!
//! `docProps/core.xml` supplies title, author and subject when present.
//! Only `word/document.xml` is mandatory.

use super::Backend;
use crate::config::ConversionConfig;
use crate::document::{render_inlines, Block, Document, Inline, ListItem, Table};
use crate::error::Doc2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::SourceDocument;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";

pub struct DocxBackend;

impl Backend for DocxBackend {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn accepts(&self, format: InputFormat) -> bool {
        format == InputFormat::Docx
    }

    fn convert(
        &self,
        source: &SourceDocument,
        _config: &ConversionConfig,
    ) -> Result<Document, Doc2MdError> {
        let fail = |detail: String| Doc2MdError::ConversionFailed {
            backend: "docx",
            source_name: source.origin.clone(),
            detail,
        };

        let mut archive = ZipArchive::new(Cursor::new(source.bytes.as_slice()))
            .map_err(|e| fail(format!("not a ZIP archive: {e}")))?;

        let body = read_part(&mut archive, DOCUMENT_PART)
            .map_err(&fail)?
            .ok_or_else(|| fail(format!("missing {DOCUMENT_PART}")))?;

        let mut parts = Parts::default();
        if let Some(xml) = read_part(&mut archive, STYLES_PART).map_err(&fail)? {
            parts.styles = parse_styles(&xml).map_err(&fail)?;
        }
        if let Some(xml) = read_part(&mut archive, NUMBERING_PART).map_err(&fail)? {
            parts.numbering = parse_numbering(&xml).map_err(&fail)?;
        }
        if let Some(xml) = read_part(&mut archive, RELS_PART).map_err(&fail)? {
            parts.links = parse_relationships(&xml).map_err(&fail)?;
        }
        debug!(
            "docx parts: {} styles, {} numbering defs, {} links",
            parts.styles.len(),
            parts.numbering.nums.len(),
            parts.links.len()
        );

        let mut doc = Document::new();
        if let Some(xml) = read_part(&mut archive, CORE_PART).map_err(&fail)? {
            apply_core_properties(&xml, &mut doc).map_err(&fail)?;
        }
        doc.blocks = BodyParser::new(&parts).parse(&body).map_err(&fail)?;
        Ok(doc)
    }
}

/// Read an archive part, or `None` when it does not exist.
/// Upper bound on the buffer reserved up front for one part.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// The declared uncompressed size comes from the archive itself, so it only
/// sizes the initial allocation up to [`MAX_PREALLOC`].
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, String> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("{name}: {e}")),
    };
    let mut buf = Vec::with_capacity(capacity_hint(file.size()));
    file.read_to_end(&mut buf)
        .map_err(|e| format!("{name}: {e}"))?;
    Ok(Some(buf))
}

// ── Side parts ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Parts {
    styles: HashMap<String, StyleInfo>,
    numbering: Numbering,
    links: HashMap<String, String>,
}

#[derive(Debug, Default, Clone)]
struct StyleInfo {
    name: String,
    based_on: Option<String>,
    outline_level: Option<u8>,
}

#[derive(Debug, Default)]
struct Numbering {
    /// numId → abstractNumId
    nums: HashMap<String, String>,
    /// abstractNumId → (ilvl → ordered?)
    levels: HashMap<String, HashMap<u32, bool>>,
}

impl Numbering {
    fn is_ordered(&self, num_id: &str, ilvl: u32) -> bool {
        self.nums
            .get(num_id)
            .and_then(|abs| self.levels.get(abs))
            .and_then(|lvls| lvls.get(&ilvl))
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParagraphKind {
    Heading(u8),
    Quote,
    Code,
    Body,
}

impl Parts {
    /// Classify a paragraph style, following `basedOn` links.
    fn paragraph_kind(&self, style_id: &str) -> ParagraphKind {
        let mut current = Some(style_id.to_string());
        for _ in 0..8 {
            let Some(id) = current else { break };
            let info = self.styles.get(&id);
            let name = info.map(|s| s.name.as_str()).unwrap_or(id.as_str());

            let kind = kind_from_style_name(name);
            if kind != ParagraphKind::Body {
                return kind;
            }
            if let Some(level) = info.and_then(|s| s.outline_level) {
                if level < 9 {
                    return ParagraphKind::Heading((level + 1).min(6));
                }
            }
            current = info.and_then(|s| s.based_on.clone());
        }
        ParagraphKind::Body
    }
}

fn kind_from_style_name(name: &str) -> ParagraphKind {
    let norm: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if norm == "title" {
        return ParagraphKind::Heading(1);
    }
    if let Some(n) = norm.strip_prefix("heading") {
        if let Ok(level) = n.parse::<u8>() {
            return ParagraphKind::Heading(level.clamp(1, 6));
        }
    }
    match norm.as_str() {
        "quote" | "intensequote" | "blockquote" | "blocktext" => ParagraphKind::Quote,
        "code" | "sourcecode" | "codeblock" | "htmlpreformatted" | "verbatim" => {
            ParagraphKind::Code
        }
        _ => ParagraphKind::Body,
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>` is on; `<w:b w:val="0"/>` / `"false"` / `"none"` is off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr(e, b"val").as_deref(),
        Some("0") | Some("false") | Some("none")
    )
}

fn parse_styles(xml: &[u8]) -> Result<HashMap<String, StyleInfo>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut current: Option<(String, StyleInfo)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"style" => {
                        current = attr(e, b"styleId").map(|id| (id, StyleInfo::default()));
                    }
                    b"name" => {
                        if let (Some((_, info)), Some(v)) = (current.as_mut(), attr(e, b"val")) {
                            info.name = v;
                        }
                    }
                    b"basedOn" => {
                        if let Some((_, info)) = current.as_mut() {
                            info.based_on = attr(e, b"val");
                        }
                    }
                    b"outlineLvl" => {
                        if let Some((_, info)) = current.as_mut() {
                            info.outline_level = attr(e, b"val").and_then(|v| v.parse().ok());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => {
                if let Some((id, info)) = current.take() {
                    styles.insert(id, info);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{STYLES_PART}: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

fn parse_numbering(xml: &[u8]) -> Result<Numbering, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut numbering = Numbering::default();
    let mut abstract_id: Option<String> = None;
    let mut level: Option<u32> = None;
    let mut num_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = attr(e, b"abstractNumId"),
                b"lvl" => level = attr(e, b"ilvl").and_then(|v| v.parse().ok()),
                b"numFmt" => {
                    if let (Some(abs), Some(lvl)) = (abstract_id.as_ref(), level) {
                        let fmt = attr(e, b"val").unwrap_or_default();
                        let ordered = !matches!(fmt.as_str(), "bullet" | "none" | "");
                        numbering
                            .levels
                            .entry(abs.clone())
                            .or_default()
                            .insert(lvl, ordered);
                    }
                }
                b"num" => num_id = attr(e, b"numId"),
                b"abstractNumId" => {
                    if let (Some(id), Some(abs)) = (num_id.as_ref(), attr(e, b"val")) {
                        numbering.nums.insert(id.clone(), abs);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = None,
                b"lvl" => level = None,
                b"num" => num_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{NUMBERING_PART}: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(numbering)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut links = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let is_link = attr(e, b"Type")
                    .map(|t| t.ends_with("/hyperlink"))
                    .unwrap_or(false);
                if let (true, Some(id), Some(target)) = (is_link, attr(e, b"Id"), attr(e, b"Target"))
                {
                    links.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{RELS_PART}: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(links)
}

fn apply_core_properties(xml: &[u8], doc: &mut Document) -> Result<(), String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut field: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => field = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(ref t)) => {
                let value = t.unescape().map_err(|e| format!("{CORE_PART}: {e}"))?;
                let value = value.trim();
                let slot = match field.as_deref() {
                    Some(b"title") => Some(&mut doc.metadata.title),
                    Some(b"creator") => Some(&mut doc.metadata.author),
                    Some(b"subject") => Some(&mut doc.metadata.subject),
                    _ => None,
                };
                if let (Some(slot), false) = (slot, value.is_empty()) {
                    *slot = Some(value.to_string());
                }
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("{CORE_PART}: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

// ── Body ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ParagraphState {
    style: Option<String>,
    num_id: Option<String>,
    ilvl: u32,
    inlines: Vec<Inline>,
}

#[derive(Default)]
struct RunState {
    text: String,
    bold: bool,
    italic: bool,
    mono: bool,
}

struct LinkState {
    url: Option<String>,
    start: usize,
    /// Number of open paragraphs when the link started.
    depth: usize,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

/// Streaming walker over `word/document.xml`.
struct BodyParser<'a> {
    parts: &'a Parts,
    blocks: Vec<Block>,
    /// Open paragraphs; a text box nests whole paragraphs inside a run.
    paras: Vec<ParagraphState>,
    runs: Vec<RunState>,
    links: Vec<LinkState>,
    tables: Vec<TableState>,
    in_text: bool,
    in_para_props: bool,
    /// Depth inside `mc:Fallback`, which repeats the `mc:Choice` content.
    fallback_depth: usize,
}

impl<'a> BodyParser<'a> {
    fn new(parts: &'a Parts) -> Self {
        Self {
            parts,
            blocks: Vec::new(),
            paras: Vec::new(),
            runs: Vec::new(),
            links: Vec::new(),
            tables: Vec::new(),
            in_text: false,
            in_para_props: false,
            fallback_depth: 0,
        }
    }

    fn parse(mut self, xml: &[u8]) -> Result<Vec<Block>, String> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => self.start(e),
                Ok(Event::Empty(ref e)) => {
                    self.start(e);
                    self.end(e.local_name().as_ref());
                }
                Ok(Event::End(ref e)) => self.end(e.local_name().as_ref()),
                Ok(Event::Text(ref t)) if self.in_text => {
                    let text = t.unescape().map_err(|e| format!("{DOCUMENT_PART}: {e}"))?;
                    self.push_run_text(&text);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(format!(
                        "{DOCUMENT_PART} at byte {}: {e}",
                        reader.error_position()
                    ))
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(self.blocks)
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        if name.as_ref() == b"Fallback" {
            self.fallback_depth += 1;
            return;
        }
        if self.fallback_depth > 0 {
            return;
        }

        match name.as_ref() {
            b"p" => self.paras.push(ParagraphState::default()),
            b"pPr" => self.in_para_props = true,
            b"pStyle" => {
                if let Some(p) = self.paras.last_mut() {
                    p.style = attr(e, b"val");
                }
            }
            b"ilvl" => {
                if let Some(p) = self.paras.last_mut() {
                    p.ilvl = attr(e, b"val").and_then(|v| v.parse().ok()).unwrap_or(0);
                }
            }
            b"numId" => {
                if let Some(p) = self.paras.last_mut() {
                    // numId 0 explicitly removes numbering.
                    p.num_id = attr(e, b"val").filter(|v| v != "0");
                }
            }
            b"r" => self.runs.push(RunState::default()),
            // Run properties inside pPr describe the paragraph mark, not text.
            b"b" if !self.in_para_props => self.set_run(|r, on| r.bold = on, toggle_on(e)),
            b"i" if !self.in_para_props => self.set_run(|r, on| r.italic = on, toggle_on(e)),
            b"rStyle" if !self.in_para_props => {
                let style = attr(e, b"val").unwrap_or_default().to_lowercase();
                let mono = style.contains("code") || style.contains("verbatim");
                self.set_run(|r, on| r.mono |= on, mono);
            }
            b"rFonts" if !self.in_para_props => {
                let font = attr(e, b"ascii").unwrap_or_default().to_lowercase();
                let mono = ["courier", "consolas", "mono", "menlo"]
                    .iter()
                    .any(|f| font.contains(f));
                self.set_run(|r, on| r.mono |= on, mono);
            }
            b"t" => self.in_text = true,
            // Tab stops in pPr are layout, not text.
            b"tab" if !self.in_para_props => self.push_run_text(" "),
            b"br" | b"cr" => self.push_run_text("\n"),
            b"hyperlink" => {
                let url = attr(e, b"id")
                    .and_then(|id| self.parts.links.get(&id).cloned())
                    .or_else(|| attr(e, b"anchor").map(|a| format!("#{a}")));
                let start = self.paras.last().map(|p| p.inlines.len()).unwrap_or(0);
                self.links.push(LinkState {
                    url,
                    start,
                    depth: self.paras.len(),
                });
            }
            b"tbl" => self.tables.push(TableState::default()),
            b"tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.row = Some(Vec::new());
                }
            }
            b"tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.cell = Some(String::new());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name == b"Fallback" {
            self.fallback_depth = self.fallback_depth.saturating_sub(1);
            return;
        }
        if self.fallback_depth > 0 {
            return;
        }

        match name {
            b"t" => self.in_text = false,
            b"pPr" => self.in_para_props = false,
            b"r" => self.finish_run(),
            b"hyperlink" => self.finish_link(),
            b"p" => self.finish_paragraph(),
            b"tc" => {
                if let Some(t) = self.tables.last_mut() {
                    if let (Some(row), Some(cell)) = (t.row.as_mut(), t.cell.take()) {
                        row.push(cell.trim().to_string());
                    }
                }
            }
            b"tr" => {
                if let Some(t) = self.tables.last_mut() {
                    if let Some(row) = t.row.take() {
                        t.rows.push(row);
                    }
                }
            }
            b"tbl" => self.finish_table(),
            _ => {}
        }
    }

    fn set_run(&mut self, apply: impl FnOnce(&mut RunState, bool), on: bool) {
        if let Some(r) = self.runs.last_mut() {
            apply(r, on);
        }
    }

    fn push_run_text(&mut self, s: &str) {
        if let Some(r) = self.runs.last_mut() {
            r.text.push_str(s);
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.runs.pop() else { return };
        // Never merge across the start of an open hyperlink.
        let floor = self
            .links
            .last()
            .filter(|l| l.depth == self.paras.len())
            .map(|l| l.start)
            .unwrap_or(0);
        let Some(para) = self.paras.last_mut() else { return };
        if run.text.is_empty() {
            return;
        }

        let inline = if run.mono {
            Inline::Code(run.text)
        } else if run.bold {
            Inline::Strong(run.text)
        } else if run.italic {
            Inline::Emphasis(run.text)
        } else {
            Inline::Text(run.text)
        };

        // Word splits text into many runs with identical formatting; merge
        // plain neighbours back together.
        if para.inlines.len() <= floor {
            para.inlines.push(inline);
            return;
        }
        match (para.inlines.last_mut(), &inline) {
            (Some(Inline::Text(prev)), Inline::Text(t)) => prev.push_str(t),
            (Some(Inline::Strong(prev)), Inline::Strong(t)) => prev.push_str(t),
            (Some(Inline::Emphasis(prev)), Inline::Emphasis(t)) => prev.push_str(t),
            (Some(Inline::Code(prev)), Inline::Code(t)) => prev.push_str(t),
            _ => para.inlines.push(inline),
        }
    }

    fn finish_link(&mut self) {
        let Some(link) = self.links.pop() else { return };
        let Some(url) = link.url else { return };
        let Some(para) = self.paras.last_mut() else { return };
        if link.start > para.inlines.len() {
            return;
        }

        let text = plain_text(&para.inlines.split_off(link.start));
        para.inlines.push(Inline::Link { text, url });
    }

    fn finish_paragraph(&mut self) {
        let Some(para) = self.paras.pop() else { return };

        // Inside a table, paragraphs flatten into the current cell.
        if let Some(t) = self.tables.last_mut() {
            if let Some(cell) = t.cell.as_mut() {
                let text = render_inlines(&para.inlines);
                let text = text.trim();
                if !text.is_empty() {
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(text);
                }
            }
            return;
        }

        if para.inlines.is_empty() {
            return;
        }

        let kind = para
            .style
            .as_deref()
            .map(|s| self.parts.paragraph_kind(s))
            .unwrap_or(ParagraphKind::Body);

        match kind {
            ParagraphKind::Heading(level) => {
                let text = plain_text(&para.inlines);
                if !text.trim().is_empty() {
                    self.blocks.push(Block::Heading { level, text });
                }
            }
            ParagraphKind::Quote => {
                self.blocks.push(Block::Quote(render_inlines(&para.inlines)));
            }
            ParagraphKind::Code => {
                let line = plain_text(&para.inlines);
                match self.blocks.last_mut() {
                    Some(Block::Code { language: None, code }) => {
                        code.push('\n');
                        code.push_str(&line);
                    }
                    _ => self.blocks.push(Block::Code {
                        language: None,
                        code: line,
                    }),
                }
            }
            ParagraphKind::Body => match para.num_id.as_deref() {
                Some(num_id) => {
                    let ordered = self.parts.numbering.is_ordered(num_id, para.ilvl);
                    self.push_list_item(ordered, para.ilvl as usize, para.inlines);
                }
                None => {
                    if !plain_text(&para.inlines).trim().is_empty() {
                        self.blocks.push(Block::Paragraph(para.inlines));
                    }
                }
            },
        }
    }

    fn push_list_item(&mut self, ordered: bool, level: usize, content: Vec<Inline>) {
        let item = ListItem { level, content };
        // Nested levels may mix numbering styles; the outermost level decides.
        if let Some(Block::List { ordered: o, items }) = self.blocks.last_mut() {
            if level > 0 || *o == ordered {
                items.push(item);
                return;
            }
        }
        self.blocks.push(Block::List {
            ordered,
            items: vec![item],
        });
    }

    fn finish_table(&mut self) {
        let Some(table) = self.tables.pop() else { return };

        // A nested table collapses into the enclosing cell.
        if let Some(outer) = self.tables.last_mut() {
            if let Some(cell) = outer.cell.as_mut() {
                let flat = table
                    .rows
                    .iter()
                    .map(|r| r.join(" "))
                    .collect::<Vec<_>>()
                    .join(" ");
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(flat.trim());
            }
            return;
        }

        if !table.rows.is_empty() {
            self.blocks.push(Block::Table(Table {
                header: None,
                rows: table.rows,
            }));
        }
    }
}

fn plain_text(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|i| match i {
            Inline::Text(t) | Inline::Strong(t) | Inline::Emphasis(t) | Inline::Code(t) => {
                t.as_str()
            }
            Inline::Link { text, .. } => text.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn body(inner: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {W}><w:body>{inner}</w:body></w:document>"#)
    }

    fn build_docx(parts: &[(&str, String)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            for (name, content) in parts {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn convert(parts: &[(&str, String)]) -> Result<Document, Doc2MdError> {
        let src = SourceDocument::from_bytes("test.docx", build_docx(parts));
        DocxBackend.convert(&src, &ConversionConfig::default())
    }

    fn para(style: Option<&str>, runs: &str) -> String {
        let ppr = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
            .unwrap_or_default();
        format!("<w:p>{ppr}{runs}</w:p>")
    }

    fn run(text: &str) -> String {
        format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#)
    }

    #[test]
    fn headings_resolve_through_style_names() {
        let styles = format!(
            r#"<w:styles {W}>
                <w:style w:type="paragraph" w:styleId="Ueberschrift2"><w:name w:val="heading 2"/></w:style>
                <w:style w:type="paragraph" w:styleId="MyChapter"><w:name w:val="Chapter"/><w:basedOn w:val="Ueberschrift2"/></w:style>
                <w:style w:type="paragraph" w:styleId="Outline"><w:name w:val="Outline"/><w:pPr><w:outlineLvl w:val="2"/></w:pPr></w:style>
            </w:styles>"#
        );
        let xml = body(&[
            para(Some("Title"), &run("Report")),
            para(Some("Ueberschrift2"), &run("Localised")),
            para(Some("MyChapter"), &run("Inherited")),
            para(Some("Outline"), &run("By outline")),
            para(None, &run("Body text")),
        ]
        .concat());
        let doc = convert(&[("word/document.xml", xml), ("word/styles.xml", styles)]).unwrap();
        assert_eq!(
            doc.export_to_markdown(),
            "# Report\n\n## Localised\n\n## Inherited\n\n### By outline\n\nBody text\n"
        );
    }

    #[test]
    fn run_formatting_and_merging() {
        let runs = format!(
            r#"{}{}<w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>{}<w:r><w:rPr><w:i/><w:b w:val="0"/></w:rPr><w:t>it</w:t></w:r><w:r><w:rPr><w:rFonts w:ascii="Courier New"/></w:rPr><w:t>x()</w:t></w:r>"#,
            run("Hel"),
            run("lo "),
            run(" and "),
        );
        let doc = convert(&[("word/document.xml", body(&para(None, &runs)))]).unwrap();
        assert_eq!(doc.export_to_markdown(), "Hello **bold** and *it*`x()`\n");
    }

    #[test]
    fn lists_use_numbering_definitions() {
        let numbering = format!(
            r#"<w:numbering {W}>
                <w:abstractNum w:abstractNumId="10"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
                <w:abstractNum w:abstractNumId="20"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl><w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
                <w:num w:numId="1"><w:abstractNumId w:val="10"/></w:num>
                <w:num w:numId="2"><w:abstractNumId w:val="20"/></w:num>
            </w:numbering>"#
        );
        let item = |num: &str, lvl: u32, text: &str| {
            format!(
                r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{lvl}"/><w:numId w:val="{num}"/></w:numPr></w:pPr>{}</w:p>"#,
                run(text)
            )
        };
        let xml = body(
            &[
                item("1", 0, "first"),
                item("1", 0, "second"),
                para(None, &run("between")),
                item("2", 0, "dot"),
                item("2", 1, "nested"),
            ]
            .concat(),
        );
        let doc = convert(&[
            ("word/document.xml", xml),
            ("word/numbering.xml", numbering),
        ])
        .unwrap();
        assert_eq!(
            doc.export_to_markdown(),
            "1. first\n2. second\n\nbetween\n\n- dot\n  - nested\n"
        );
    }

    #[test]
    fn tables_become_gfm() {
        let cell = |t: &str| format!("<w:tc>{}</w:tc>", para(None, &run(t)));
        let xml = body(&format!(
            "<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>",
            cell("Metric"),
            cell("Value"),
            cell("p99"),
            cell("12 ms")
        ));
        let doc = convert(&[("word/document.xml", xml)]).unwrap();
        assert_eq!(
            doc.export_to_markdown(),
            "| Metric | Value |\n| --- | --- |\n| p99 | 12 ms |\n"
        );
    }

    #[test]
    fn hyperlinks_resolve_relationships() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/docs" TargetMode="External"/>
        </Relationships>"#
            .to_string();
        let runs = format!(
            r#"{}<w:hyperlink r:id="rId9">{}</w:hyperlink>"#,
            run("See "),
            run("the docs")
        );
        let doc = convert(&[
            ("word/document.xml", body(&para(None, &runs))),
            ("word/_rels/document.xml.rels", rels),
        ])
        .unwrap();
        assert_eq!(
            doc.export_to_markdown(),
            "See [the docs](https://example.com/docs)\n"
        );
    }

    #[test]
    fn text_box_keeps_enclosing_paragraph() {
        let text_box = format!(
            r#"<w:r><mc:AlternateContent xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006">
                <mc:Choice Requires="wps"><w:drawing><wps:wsp xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><wps:txbx><w:txbxContent>{}</w:txbxContent></wps:txbx></wps:wsp></w:drawing></mc:Choice>
                <mc:Fallback><w:pict><v:textbox xmlns:v="urn:schemas-microsoft-com:vml"><w:txbxContent>{}</w:txbxContent></v:textbox></w:pict></mc:Fallback>
            </mc:AlternateContent></w:r>"#,
            para(None, &run("Inside box")),
            para(None, &run("Inside box")),
        );
        let runs = format!("{}{text_box}{}", run("Before box "), run("after box."));
        let xml = body(&[para(None, &runs), para(None, &run("Next"))].concat());
        let doc = convert(&[("word/document.xml", xml)]).unwrap();
        assert_eq!(
            doc.export_to_markdown(),
            "Inside box\n\nBefore box after box.\n\nNext\n"
        );
    }

    #[test]
    fn nested_run_does_not_swallow_outer_run() {
        let runs = format!(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>Bold </w:t><w:drawing><w:txbxContent>{}</w:txbxContent></w:drawing><w:t xml:space="preserve">tail</w:t></w:r>"#,
            para(None, &run("boxed"))
        );
        let doc = convert(&[("word/document.xml", body(&para(None, &runs)))]).unwrap();
        assert_eq!(doc.export_to_markdown(), "boxed\n\n**Bold tail**\n");
    }

    #[test]
    fn tab_stops_in_paragraph_properties_are_not_text() {
        let xml = body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r></w:p>"#,
        );
        let doc = convert(&[("word/document.xml", xml)]).unwrap();
        assert_eq!(doc.export_to_markdown(), "a b\n");
    }

    #[test]
    fn part_capacity_is_capped() {
        assert_eq!(capacity_hint(1024), 1024);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOC as usize);
    }

    #[test]
    fn core_properties_fill_metadata() {
        let core = r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/">
            <dc:title>Perf Report</dc:title><dc:creator>Ops</dc:creator></cp:coreProperties>"#
            .to_string();
        let doc = convert(&[
            ("word/document.xml", body(&para(None, &run("x")))),
            ("docProps/core.xml", core),
        ])
        .unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Perf Report"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Ops"));
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let err = convert(&[("word/styles.xml", String::from("<w:styles/>"))]).unwrap_err();
        match err {
            Doc2MdError::ConversionFailed { backend, detail, .. } => {
                assert_eq!(backend, "docx");
                assert!(detail.contains("word/document.xml"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_a_zip_is_an_error() {
        let src = SourceDocument::from_bytes("fake.docx", b"hello".to_vec());
        let err = DocxBackend
            .convert(&src, &ConversionConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("not a ZIP archive"));
    }
}
