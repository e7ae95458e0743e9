//! Lightweight metadata extraction from synced documents.
//!
//! Markdown files may carry a YAML front-matter block; anything it does not
//! provide is filled in from the first H1, a `Triage: <Color>` line, and the
//! first line of body text. Malformed front-matter never fails extraction.

use crate::error::Result;
use crate::io;
use regex::Regex;
use serde_yaml::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Summaries longer than this many characters are cut and get a trailing `…`.
pub const SUMMARY_MAX_CHARS: usize = 240;

const ELLIPSIS: char = '…';

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Raw extracted metadata; triage is not yet normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub triage: Option<String>,
}

// ---------------------------------------------------------------------------
// Regexes
// ---------------------------------------------------------------------------

static FRONT_RE: OnceLock<Regex> = OnceLock::new();
static H1_RE: OnceLock<Regex> = OnceLock::new();
static TRIAGE_RE: OnceLock<Regex> = OnceLock::new();

fn front_re() -> &'static Regex {
    FRONT_RE.get_or_init(|| {
        Regex::new(r"\A---[ \t]*\r?\n((?s:.*?))\r?\n---[ \t]*\r?\n").unwrap()
    })
}

fn h1_re() -> &'static Regex {
    H1_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*#[ \t]+(.+?)[ \t\r]*$").unwrap())
}

fn triage_re() -> &'static Regex {
    TRIAGE_RE.get_or_init(|| {
        Regex::new(r"(?mi)^triage:[ \t]*(blue|green|yellow|orange|red)[ \t\r]*$").unwrap()
    })
}

// ---------------------------------------------------------------------------
// Front-matter
// ---------------------------------------------------------------------------

/// Split a leading `---` delimited block from the body.
///
/// Returns `(None, text)` when the text does not open with a complete block.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    match front_re().captures(text) {
        Some(caps) => {
            let whole = caps.get(0).map_or(0, |m| m.end());
            let block = caps.get(1).map(|m| m.as_str());
            (block, &text[whole..])
        }
        None => (None, text),
    }
}

/// Non-empty scalar as a string. Strings are kept verbatim; numbers and
/// booleans are rendered; null, sequences and mappings are ignored.
fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn apply_front_matter(block: &str, meta: &mut Meta) {
    let doc: Value = match serde_yaml::from_str(block) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "ignoring malformed front-matter");
            return;
        }
    };
    let Value::Mapping(map) = doc else {
        debug!("ignoring front-matter that is not a mapping");
        return;
    };

    meta.title = map.get("title").and_then(scalar_string);
    meta.triage = match map.get("triage") {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        _ => None,
    };
    meta.summary = map.get("summary").and_then(scalar_string);
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

/// Cut to [`SUMMARY_MAX_CHARS`] characters and append `…` when longer.
pub fn truncate_summary(line: &str) -> String {
    if line.chars().count() > SUMMARY_MAX_CHARS {
        let mut cut: String = line.chars().take(SUMMARY_MAX_CHARS).collect();
        cut.push(ELLIPSIS);
        cut
    } else {
        line.to_string()
    }
}

fn first_heading(body: &str) -> Option<String> {
    h1_re()
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn triage_marker(raw: &str) -> Option<String> {
    triage_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn first_content_line(body: &str) -> Option<String> {
    body.lines()
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| truncate_summary(line.trim()))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract metadata from markdown `text`.
pub fn extract_markdown(text: &str) -> Meta {
    let mut meta = Meta::default();
    let (block, body) = split_front_matter(text);
    if let Some(block) = block {
        apply_front_matter(block, &mut meta);
    }

    if meta.title.is_none() {
        meta.title = first_heading(body);
    }
    // The marker may sit anywhere, including inside the front-matter block.
    if meta.triage.is_none() {
        meta.triage = triage_marker(text);
    }
    if meta.summary.is_none() {
        meta.summary = first_content_line(body);
    }
    meta
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("mdx"))
        .unwrap_or(false)
}

/// Extract metadata for the file at `path`. Non-markdown files are not read:
/// their title is the file stem and they carry no summary or triage.
pub fn extract(path: &Path) -> Result<Meta> {
    if !is_markdown(path) {
        return Ok(Meta {
            title: path.file_stem().map(|s| s.to_string_lossy().into_owned()),
            summary: None,
            triage: None,
        });
    }
    let text = io::read_text_lossy(path)?;
    Ok(extract_markdown(&text))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn front_matter_fields_win() {
        let meta = extract_markdown("---\ntitle: Foo\ntriage: red\nsummary: hi\n---\n# Other\nBody\n");
        assert_eq!(meta.title.as_deref(), Some("Foo"));
        assert_eq!(meta.triage.as_deref(), Some("red"));
        assert_eq!(meta.summary.as_deref(), Some("hi"));
    }

    #[test]
    fn heading_and_marker_without_front_matter() {
        let text = "# My Title\n\nIntro paragraph.\n\nTriage: orange\n";
        let meta = extract_markdown(text);
        assert_eq!(meta.title.as_deref(), Some("My Title"));
        assert_eq!(meta.triage.as_deref(), Some("orange"));
        assert_eq!(meta.summary.as_deref(), Some("Intro paragraph."));
    }

    #[test]
    fn marker_keyword_is_case_insensitive_and_anchored() {
        assert_eq!(
            extract_markdown("TRIAGE:   Yellow  \n").triage.as_deref(),
            Some("Yellow")
        );
        assert_eq!(extract_markdown("Triage: Yellowish\n").triage, None);
        assert_eq!(extract_markdown("See Triage: Red\n").triage, None);
        assert_eq!(extract_markdown("Triage: Purple\n").triage, None);
    }

    #[test]
    fn marker_found_inside_malformed_front_matter() {
        let text = "---\ntitle: [unclosed\nTriage: Green\n---\n# Heading\nText\n";
        let meta = extract_markdown(text);
        assert_eq!(meta.title.as_deref(), Some("Heading"));
        assert_eq!(meta.triage.as_deref(), Some("Green"));
        assert_eq!(meta.summary.as_deref(), Some("Text"));
    }

    #[test]
    fn non_mapping_front_matter_is_ignored() {
        let meta = extract_markdown("---\n- a\n- b\n---\nFirst line\n");
        assert_eq!(meta.title, None);
        assert_eq!(meta.summary.as_deref(), Some("First line"));
    }

    #[test]
    fn front_matter_triage_must_be_a_string() {
        let meta = extract_markdown("---\ntriage: 3\n---\nTriage: Red\n");
        assert_eq!(meta.triage.as_deref(), Some("Red"));
    }

    #[test]
    fn blank_front_matter_triage_falls_through_to_marker() {
        let meta = extract_markdown("---\ntitle: T\ntriage: \"\"\n---\nTriage: Red\n");
        assert_eq!(meta.triage.as_deref(), Some("Red"));
        let meta = extract_markdown("---\ntriage: \"   \"\n---\nTriage: green\n");
        assert_eq!(meta.triage.as_deref(), Some("green"));
    }

    #[test]
    fn numeric_title_is_rendered() {
        let meta = extract_markdown("---\ntitle: 2024\n---\nbody\n");
        assert_eq!(meta.title.as_deref(), Some("2024"));
    }

    #[test]
    fn summary_skips_headings_and_blank_lines() {
        let meta = extract_markdown("\n# Title\n## Sub\n   \n  indented text  \n");
        assert_eq!(meta.summary.as_deref(), Some("indented text"));
    }

    #[test]
    fn h1_ignores_deeper_headings() {
        let meta = extract_markdown("## Not this\n# This one\n");
        assert_eq!(meta.title.as_deref(), Some("This one"));
    }

    #[test]
    fn summary_truncation_boundaries() {
        let exact = "a".repeat(SUMMARY_MAX_CHARS);
        assert_eq!(truncate_summary(&exact), exact);

        let long = "b".repeat(SUMMARY_MAX_CHARS + 1);
        let cut = truncate_summary(&long);
        assert_eq!(cut.chars().count(), SUMMARY_MAX_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(&cut[..SUMMARY_MAX_CHARS], "b".repeat(SUMMARY_MAX_CHARS));
    }

    #[test]
    fn summary_truncation_counts_chars_not_bytes() {
        let long = "é".repeat(SUMMARY_MAX_CHARS + 5);
        let cut = truncate_summary(&long);
        assert_eq!(cut.chars().count(), SUMMARY_MAX_CHARS + 1);
    }

    #[test]
    fn split_requires_closing_delimiter() {
        let (block, body) = split_front_matter("---\ntitle: x\nno close\n");
        assert!(block.is_none());
        assert_eq!(body, "---\ntitle: x\nno close\n");

        let (block, body) = split_front_matter("---\ntitle: x\n---\nbody");
        assert_eq!(block, Some("title: x"));
        assert_eq!(body, "body");
    }

    #[test]
    fn crlf_front_matter() {
        let meta = extract_markdown("---\r\ntitle: Win\r\n---\r\nLine one\r\n");
        assert_eq!(meta.title.as_deref(), Some("Win"));
        assert_eq!(meta.summary.as_deref(), Some("Line one"));
    }

    #[test]
    fn extract_non_markdown_uses_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "# Not parsed\nTriage: Red\n").unwrap();
        let meta = extract(&path).unwrap();
        assert_eq!(meta.title.as_deref(), Some("notes"));
        assert_eq!(meta.summary, None);
        assert_eq!(meta.triage, None);
    }

    #[test]
    fn extract_reads_mdx_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Page.MDX");
        std::fs::write(&path, "# Page\n").unwrap();
        assert!(is_markdown(&path));
        assert_eq!(extract(&path).unwrap().title.as_deref(), Some("Page"));
    }
}
