//! In-memory document model shared by all backends.
//!
//! Backends translate their native structure (HTML tree, WordprocessingML,
//! PDF text layer) into a flat list of [`Block`]s. Rendering to Markdown
//! happens in one place, [`Document::export_to_markdown`], so every format
//! gets the same heading, list and table conventions.

use crate::config::PageSeparator;
use serde::{Deserialize, Serialize};

/// Descriptive metadata, filled in as far as the source format allows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    /// Number of pages, for paged formats (PDF).
    pub page_count: Option<usize>,
}

/// A converted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub blocks: Vec<Block>,
}

/// Block-level content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// ATX heading; `level` is clamped to 1–6 when rendered.
    Heading { level: u8, text: String },
    Paragraph(Vec<Inline>),
    List { ordered: bool, items: Vec<ListItem> },
    Table(Table),
    Code {
        language: Option<String>,
        code: String,
    },
    Quote(String),
    Rule,
    /// Boundary before page `page` (1-indexed) of a paged source.
    PageBreak { page: usize },
    /// A fragment the backend already produced as Markdown.
    Markdown(String),
}

/// One entry of a list; `level` is the nesting depth starting at 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub level: usize,
    pub content: Vec<Inline>,
}

/// A table. When `header` is `None` the first row is promoted to the header,
/// since GFM tables cannot exist without one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

/// Inline (span-level) content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
    Code(String),
    Link { text: String, url: String },
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// True when the document holds no visible content.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| {
            matches!(b, Block::PageBreak { .. })
                || b.render(&PageSeparator::None).trim().is_empty()
        })
    }

    /// Render the document as Markdown, joining pages with a blank line.
    pub fn export_to_markdown(&self) -> String {
        self.export_to_markdown_with(&PageSeparator::None)
    }

    /// Render the document as Markdown using `separator` between pages.
    pub fn export_to_markdown_with(&self, separator: &PageSeparator) -> String {
        let parts: Vec<String> = self
            .blocks
            .iter()
            .map(|b| b.render(separator))
            .filter(|s| !s.trim().is_empty())
            .collect();

        let mut out = parts.join("\n\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

impl Block {
    fn render(&self, separator: &PageSeparator) -> String {
        match self {
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6) as usize;
                let text = collapse_whitespace(text);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("{} {}", "#".repeat(level), text)
                }
            }
            Block::Paragraph(inlines) => render_inlines(inlines).trim().to_string(),
            Block::List { ordered, items } => render_list(*ordered, items),
            Block::Table(table) => render_table(table),
            Block::Code { language, code } => {
                let fence = fence_for(code);
                format!(
                    "{fence}{}\n{}\n{fence}",
                    language.as_deref().unwrap_or(""),
                    code.trim_end_matches('\n')
                )
            }
            Block::Quote(text) => text
                .trim()
                .lines()
                .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Rule => "---".to_string(),
            Block::PageBreak { page } => separator.render(*page).trim().to_string(),
            Block::Markdown(md) => md.trim_matches('\n').to_string(),
        }
    }
}

/// Render a run of inlines, inserting nothing between them: backends keep
/// the original spacing inside the text runs.
pub fn render_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) => out.push_str(t),
            Inline::Strong(t) => push_wrapped(&mut out, t, "**"),
            Inline::Emphasis(t) => push_wrapped(&mut out, t, "*"),
            Inline::Code(t) => {
                if !t.is_empty() {
                    let ticks = if t.contains('`') { "``" } else { "`" };
                    out.push_str(ticks);
                    out.push_str(t);
                    out.push_str(ticks);
                }
            }
            Inline::Link { text, url } => {
                if url.is_empty() {
                    out.push_str(text);
                } else {
                    let label = if text.trim().is_empty() { url } else { text };
                    out.push_str(&format!("[{}]({})", label.trim(), url));
                }
            }
        }
    }
    out
}

/// Wrap `text` in `marker`, keeping surrounding whitespace outside the
/// markers so `**bold **` never happens.
fn push_wrapped(out: &mut String, text: &str, marker: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        out.push_str(text);
        return;
    }
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    out.push_str(lead);
    out.push_str(marker);
    out.push_str(trimmed);
    out.push_str(marker);
    out.push_str(trail);
}

fn render_list(ordered: bool, items: &[ListItem]) -> String {
    // Numbering restarts whenever a shallower level resumes.
    let mut counters: Vec<usize> = Vec::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let level = item.level;
        counters.truncate(level + 1);
        while counters.len() < level + 1 {
            counters.push(0);
        }
        counters[level] += 1;

        let indent = if ordered { "   " } else { "  " }.repeat(level);
        let marker = if ordered {
            format!("{}.", counters[level])
        } else {
            "-".to_string()
        };
        let text = render_inlines(&item.content);
        lines.push(format!("{indent}{marker} {}", text.trim()));
    }

    lines.join("\n")
}

fn render_table(table: &Table) -> String {
    let mut rows = table.rows.iter();
    let header: Vec<String> = match &table.header {
        Some(h) => h.clone(),
        None => match rows.next() {
            Some(first) => first.clone(),
            None => return String::new(),
        },
    };
    let body: Vec<&Vec<String>> = rows.collect();

    let width = body
        .iter()
        .map(|r| r.len())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let format_row = |cells: &[String]| -> String {
        let mut line = String::from("|");
        for i in 0..width {
            let cell = cells.get(i).map(|c| escape_cell(c)).unwrap_or_default();
            line.push(' ');
            line.push_str(&cell);
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(&header));
    lines.push(format!("|{}", " --- |".repeat(width)));
    for row in body {
        lines.push(format_row(row));
    }
    lines.join("\n")
}

fn escape_cell(cell: &str) -> String {
    collapse_whitespace(cell).replace('|', "\\|")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick a fence longer than any backtick run inside `code`.
fn fence_for(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn heading_levels_are_clamped() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            blocks: vec![
                Block::Heading { level: 0, text: "Top".into() },
                Block::Heading { level: 9, text: "Deep".into() },
            ],
        };
        assert_eq!(doc.export_to_markdown(), "# Top\n\n###### Deep\n");
    }

    #[test]
    fn inline_styles_keep_spacing_outside_markers() {
        let md = render_inlines(&[
            text("Hello"),
            Inline::Strong(" bold ".into()),
            text("and"),
            Inline::Emphasis(" italic".into()),
            text(" "),
            Inline::Code("x`y".into()),
        ]);
        assert_eq!(md, "Hello **bold** and *italic* ``x`y``");
    }

    #[test]
    fn link_without_text_uses_url() {
        let md = render_inlines(&[Inline::Link {
            text: String::new(),
            url: "https://example.com".into(),
        }]);
        assert_eq!(md, "[https://example.com](https://example.com)");
    }

    #[test]
    fn ordered_list_numbering_restarts_per_level() {
        let items = vec![
            ListItem { level: 0, content: vec![text("one")] },
            ListItem { level: 1, content: vec![text("one.a")] },
            ListItem { level: 1, content: vec![text("one.b")] },
            ListItem { level: 0, content: vec![text("two")] },
            ListItem { level: 1, content: vec![text("two.a")] },
        ];
        assert_eq!(
            render_list(true, &items),
            "1. one\n   1. one.a\n   2. one.b\n2. two\n   1. two.a"
        );
    }

    #[test]
    fn bullet_list_indents_two_spaces() {
        let items = vec![
            ListItem { level: 0, content: vec![text("a")] },
            ListItem { level: 1, content: vec![text("b")] },
        ];
        assert_eq!(render_list(false, &items), "- a\n  - b");
    }

    #[test]
    fn table_promotes_first_row_and_pads() {
        let table = Table {
            header: None,
            rows: vec![
                vec!["Name".into(), "Value".into()],
                vec!["a|b".into()],
                vec!["c".into(), "d".into(), "e".into()],
            ],
        };
        assert_eq!(
            render_table(&table),
            "| Name | Value |  |\n| --- | --- | --- |\n| a\\|b |  |  |\n| c | d | e |"
        );
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(render_table(&Table::default()), "");
    }

    #[test]
    fn code_fence_outgrows_content_backticks() {
        let block = Block::Code {
            language: Some("md".into()),
            code: "```\ninner\n```\n".into(),
        };
        assert_eq!(
            block.render(&PageSeparator::None),
            "````md\n```\ninner\n```\n````"
        );
    }

    #[test]
    fn page_breaks_follow_separator() {
        let doc = Document {
            metadata: DocumentMetadata::default(),
            blocks: vec![
                Block::Paragraph(vec![text("page one")]),
                Block::PageBreak { page: 2 },
                Block::Paragraph(vec![text("page two")]),
            ],
        };
        assert_eq!(doc.export_to_markdown(), "page one\n\npage two\n");
        assert_eq!(
            doc.export_to_markdown_with(&PageSeparator::Comment),
            "page one\n\n<!-- page 2 -->\n\npage two\n"
        );
    }

    #[test]
    fn quote_prefixes_every_line() {
        let block = Block::Quote("first\n\nsecond".into());
        assert_eq!(block.render(&PageSeparator::None), "> first\n>\n> second");
    }

    #[test]
    fn empty_document() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.export_to_markdown(), "");
        doc.push(Block::PageBreak { page: 2 });
        doc.push(Block::Paragraph(vec![text("   ")]));
        assert!(doc.is_empty());
        doc.push(Block::Rule);
        assert!(!doc.is_empty());
    }
}
