//! Document-level grounding text shared by every unit of a document.
//!
//! The context is the preamble before the article section plus the first
//! (definitional) article. It is computed once per document from the source
//! file, not from the split output, so edits to unit files never leak in.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::Manifest;
use crate::frontmatter;
use crate::model::DocumentMeta;
use crate::segment::lexer::{self, Line, TokenKind};
use crate::segment::SegmentRules;
use crate::slug::GENERIC_DOC_PREFIX;
use crate::util::truncate_string;

/// Default upper bound on the context excerpt, in bytes.
pub const DEFAULT_CONTEXT_MAX_CHARS: usize = 6000;

/// Bytes of the source used as preamble when no boundary heading exists.
pub const PREAMBLE_FALLBACK_BYTES: usize = 1000;

const MISSING_DEFINITIONS: &str = "[لم يتم العثور على مادة تعريفات واضحة في المادة 1]";

/// Grounding text for the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContext {
    Available(String),
    /// The source document could not be located or read.
    NoContext,
}

impl DocumentContext {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DocumentContext::Available(text) => Some(text),
            DocumentContext::NoContext => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DocumentContext::Available(_))
    }
}

/// Build the context excerpt from full source text.
pub fn extract_context(source: &str, rules: &SegmentRules, max_bytes: usize) -> String {
    let (_, text) = frontmatter::split(source);
    let lines = lexer::tokenize(text, &rules.article_label);
    let preamble = preamble(text, &lines, rules);
    let definitions = first_article(text, &lines, &rules.article_label)
        .unwrap_or_else(|| MISSING_DEFINITIONS.to_string());
    let excerpt = format!(
        "--- السياق القانوني الأساسي ---\n{preamble}\n--- نهاية السياق الأساسي ---\n--- محتوى مادة التعريفات المحتملة ---\n{definitions}\n--- نهاية محتوى التعريفات ---\n"
    );
    truncate_string(&excerpt, max_bytes)
}

fn preamble(text: &str, lines: &[Line], rules: &SegmentRules) -> String {
    let boundary = lines.iter().find(|line| match &line.kind {
        TokenKind::Heading { level, text } => {
            *level == 2 && text.starts_with(&rules.boundary_heading)
        }
        _ => false,
    });
    match boundary {
        Some(line) => text[..line.start].trim().to_string(),
        None => truncate_string(text, PREAMBLE_FALLBACK_BYTES).trim().to_string(),
    }
}

/// Article number announced by a heading or bold marker line.
fn article_number(line: &Line, label: &str) -> Option<u32> {
    let digits = match &line.kind {
        TokenKind::ArticleMarker { digits, .. } => digits.clone(),
        TokenKind::Heading { text, .. } => lexer::labelled_number(text, label)?.1,
        TokenKind::Text { .. } => return None,
    };
    digits.parse().ok()
}

fn first_article(text: &str, lines: &[Line], label: &str) -> Option<String> {
    let start_idx = lines
        .iter()
        .position(|line| article_number(line, label) == Some(1))?;
    let rest = &lines[start_idx + 1..];
    let end_idx = rest
        .iter()
        .position(|line| article_number(line, label) == Some(2))
        .or_else(|| {
            rest.iter().position(|line| {
                article_number(line, label).is_some() || line.is_heading_at_most(2)
            })
        })
        .map(|offset| start_idx + 1 + offset);
    let end = end_idx
        .map(|idx| lines[idx].start)
        .unwrap_or(text.len());
    Some(text[lines[start_idx].start..end].trim().to_string())
}

/// Find the source document a split folder was produced from.
///
/// Tries the manifest, then the parent record's `source` field, then the
/// slug with the generic prefix removed.
pub fn locate_source(
    input_dir: &Path,
    slug: &str,
    manifest: Option<&Manifest>,
    parent: Option<&DocumentMeta>,
) -> Option<PathBuf> {
    let generic = format!("{GENERIC_DOC_PREFIX}-");
    let candidates = [
        manifest.and_then(|manifest| manifest.source_file.clone()),
        parent.and_then(|meta| meta.source.clone()),
        Some(format!("{}.md", slug.strip_prefix(&generic).unwrap_or(slug))),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(|name| input_dir.join(name))
        .find(|path| path.is_file())
}

/// Load the context for one document, or [`DocumentContext::NoContext`].
pub fn load_context(
    source: Option<&Path>,
    rules: &SegmentRules,
    max_bytes: usize,
) -> Result<DocumentContext> {
    let Some(path) = source else {
        return Ok(DocumentContext::NoContext);
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(DocumentContext::Available(extract_context(
        &text, rules, max_bytes,
    )))
}
