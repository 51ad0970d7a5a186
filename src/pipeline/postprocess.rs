//! Post-processing: deterministic cleanup of rendered Markdown.
//!
//! Backends differ in how tidy their output is. `html2md` keeps whatever
//! whitespace the page had, PDF text layers carry CRLFs and soft hyphens,
//! Word documents are full of zero-width joiners. These rules normalise all
//! of that without touching content, so the file on disk looks the same
//! regardless of where it came from.
//!
//! ## Rule Order
//!
//! Line endings are normalised before trimming, and blank lines are
//! collapsed before heading spacing so that pass never has to undo extra
//! newlines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to rendered Markdown.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Trim trailing whitespace per line (hard line breaks and code fences kept)
/// 3. Collapse 3+ consecutive blank lines down to 2
/// 4. Ensure heading lines have a blank line before them (outside code fences)
/// 5. Fix GFM tables missing a separator row (outside code fences)
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 7. Ensure the file ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = normalise_heading_spacing(&s);
    let s = fix_broken_tables(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Trim trailing whitespace per line ────────────────────────────────

/// Lines inside code fences are left alone. A non-heading line ending in two
/// or more spaces and followed by more text is a hard line break and keeps
/// exactly two.
fn trim_trailing_whitespace(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            result.push(line.trim_end().to_string());
            continue;
        }
        if in_fence {
            result.push(line.to_string());
            continue;
        }

        let trimmed = line.trim_end();
        let next_has_text = lines.get(i + 1).is_some_and(|n| !n.trim().is_empty());
        let hard_break = line.ends_with("  ")
            && !trimmed.is_empty()
            && !RE_ATX_HEADING.is_match(trimmed)
            && next_has_text;
        if hard_break {
            result.push(format!("{trimmed}  "));
        } else {
            result.push(trimmed.to_string());
        }
    }
    result.join("\n")
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 4: Normalise heading spacing ────────────────────────────────────────

static RE_ATX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}(\s|$)").unwrap());

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

fn normalise_heading_spacing(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 64);
    let mut in_fence = false;

    for (i, line) in input.lines().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        let is_heading = !in_fence && RE_ATX_HEADING.is_match(line);
        if is_heading && i > 0 {
            let trimmed = result.trim_end_matches('\n');
            result.truncate(trimmed.len());
            result.push_str("\n\n");
        }
        result.push_str(line);
        result.push('\n');
    }
    result
}

// ── Rule 5: Fix broken GFM tables ───────────────────────────────────────────

/// Insert a separator row after a table's first row when it is missing.
fn fix_broken_tables(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result = Vec::with_capacity(lines.len() + 10);
    let mut prev_was_table = false;
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        if in_fence || is_fence(line) {
            result.push(line.to_string());
            prev_was_table = false;
            continue;
        }

        let starts_table = is_table_row(line) && !is_separator_row(line) && !prev_was_table;
        result.push(line.to_string());

        if starts_table {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if is_table_row(next) && !is_separator_row(next) {
                let col_count = line.matches('|').count().saturating_sub(1).max(1);
                let sep: String = std::iter::once("|")
                    .chain(std::iter::repeat_n(" --- |", col_count))
                    .collect();
                result.push(sep);
            }
        }
        prev_was_table = is_table_row(line);
    }

    result.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return false;
    }
    // A separator row contains only |, -, :, and whitespace
    trimmed
        .chars()
        .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 7: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
