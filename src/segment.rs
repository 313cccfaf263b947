//! Document segmentation into a parent record and atomic units.
//!
//! The segmenter works on the token stream from [`lexer`]: it finds the
//! article-text section, cuts it into one unit per article marker, and
//! replaces the section in the parent text with an index placeholder so the
//! parent never duplicates article content.
pub mod card;
pub mod lexer;

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::frontmatter;
use crate::model::{
    AtomicUnit, Document, DocumentMeta, UnitMeta, DEFAULT_DOMAIN, DEFAULT_PARENT_SUMMARY,
    DEFAULT_STATUS,
};
use crate::slug;
use lexer::{Line, TokenKind};

/// Default heading that introduces the full article text.
pub const DEFAULT_BOUNDARY_HEADING: &str = "النص الكامل للمواد";

/// Default word that precedes the number in article markers.
pub const DEFAULT_ARTICLE_LABEL: &str = "المادة";

/// Index marker written into the parent record in place of the articles.
pub const INDEX_PLACEHOLDER: &str = "## فهرس المواد\n\n[يتم تحديث الفهرس لاحقاً بعد الإثراء]";

/// Structural problems that make a document impossible to split.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("article section heading `## {heading}` not found")]
    MissingBoundary { heading: String },
    #[error("no `**{label} N**` article markers in the article section (lines {first_line}-{last_line})")]
    NoArticleMarkers {
        label: String,
        first_line: usize,
        last_line: usize,
    },
    #[error("line {line}: article number `{literal}` is out of range")]
    ArticleNumberOutOfRange { line: usize, literal: String },
}

/// Markers that drive segmentation.
#[derive(Debug, Clone)]
pub struct SegmentRules {
    pub boundary_heading: String,
    pub article_label: String,
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self {
            boundary_heading: DEFAULT_BOUNDARY_HEADING.to_string(),
            article_label: DEFAULT_ARTICLE_LABEL.to_string(),
        }
    }
}

/// Result of splitting one document.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub parent_meta: DocumentMeta,
    pub parent_body: String,
    /// Units in split order, before sorting and linking.
    pub units: Vec<AtomicUnit>,
    /// Line number of the boundary heading.
    pub boundary_line: usize,
    /// Non-fatal observations for the build log.
    pub notes: Vec<String>,
}

/// Byte span and line range of the article section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleSection {
    pub heading_line: usize,
    pub start: usize,
    pub end: usize,
    /// Index of the first token after the heading.
    first_token: usize,
    /// Index one past the last token in the section.
    end_token: usize,
}

/// Load a source document, reading front matter and fallback metadata.
///
/// Malformed front matter is reported and ignored rather than failing the
/// document, mirroring how a hand-edited source is best treated as plain text.
pub fn load_document(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let (mut meta, text) = match frontmatter::parse::<DocumentMeta>(&content) {
        Ok((meta, text)) => (meta.unwrap_or_default(), text),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring malformed front matter");
            (DocumentMeta::default(), content.clone())
        }
    };
    card::apply_fallbacks(&mut meta, &text)?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let doc_slug = slug::document_slug(meta.doc_type.as_deref(), meta.number.as_deref(), &stem);
    meta.doc = Some(doc_slug.clone());
    Ok(Document {
        slug: doc_slug,
        source_path: path.to_path_buf(),
        meta,
        text,
    })
}

/// Locate the article section within tokenized text.
pub fn find_article_section(
    text: &str,
    lines: &[Line],
    rules: &SegmentRules,
) -> Result<ArticleSection, StructureError> {
    let heading_idx = lines
        .iter()
        .position(|line| is_boundary(line, &rules.boundary_heading))
        .ok_or_else(|| StructureError::MissingBoundary {
            heading: rules.boundary_heading.clone(),
        })?;
    let end_idx = lines[heading_idx + 1..]
        .iter()
        .position(|line| line.is_heading_at_most(2))
        .map(|offset| heading_idx + 1 + offset)
        .unwrap_or(lines.len());
    let end = lines.get(end_idx).map(|line| line.start).unwrap_or(text.len());
    Ok(ArticleSection {
        heading_line: lines[heading_idx].number,
        start: lines[heading_idx].start,
        end,
        first_token: heading_idx + 1,
        end_token: end_idx,
    })
}

fn is_boundary(line: &Line, boundary: &str) -> bool {
    match &line.kind {
        TokenKind::Heading { level, text } => *level == 2 && text.starts_with(boundary),
        _ => false,
    }
}

/// Split `doc` into a parent record and its article units.
pub fn segment(doc: &Document, rules: &SegmentRules) -> Result<Segmentation, StructureError> {
    let text = doc.text.as_str();
    let lines = lexer::tokenize(text, &rules.article_label);
    let section = find_article_section(text, &lines, rules)?;
    let section_lines = &lines[section.first_token..section.end_token];
    let mut notes = Vec::new();

    let extra_boundaries = lines[section.end_token..]
        .iter()
        .filter(|line| is_boundary(line, &rules.boundary_heading))
        .map(|line| line.number)
        .collect::<Vec<_>>();
    if !extra_boundaries.is_empty() {
        notes.push(format!(
            "Ignored additional article section headings at lines {:?}.",
            extra_boundaries
        ));
    }

    let markers: Vec<(usize, &Line)> = section_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.is_marker())
        .collect();
    let Some((first_marker_idx, _)) = markers.first() else {
        return Err(StructureError::NoArticleMarkers {
            label: rules.article_label.clone(),
            first_line: section.heading_line,
            last_line: section_lines
                .last()
                .map(|line| line.number)
                .unwrap_or(section.heading_line),
        });
    };
    let lead_in = &section_lines[..*first_marker_idx];
    if lead_in.iter().any(|line| !matches!(line.kind, TokenKind::Text { blank: true })) {
        notes.push(format!(
            "Discarded {} line(s) of prose before the first article marker.",
            lead_in.len()
        ));
    }

    let mut units = Vec::with_capacity(markers.len());
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for (pos, (_, marker)) in markers.iter().enumerate() {
        let TokenKind::ArticleMarker { literal, digits } = &marker.kind else {
            continue;
        };
        if digits.parse::<u32>().is_err() {
            return Err(StructureError::ArticleNumberOutOfRange {
                line: marker.number,
                literal: literal.clone(),
            });
        }
        let body_end = markers
            .get(pos + 1)
            .map(|(_, next)| next.start)
            .unwrap_or(section.end);
        let content = text[marker.end.min(body_end)..body_end].trim();

        let base_id = slug::unit_id(&doc.slug, digits);
        let occurrence = seen.entry(base_id.clone()).or_insert(0);
        *occurrence += 1;
        let id = if *occurrence == 1 {
            base_id
        } else {
            notes.push(format!(
                "Duplicate article number {literal} at line {}; stored as occurrence {}.",
                marker.number, occurrence
            ));
            format!("{base_id}_{occurrence}")
        };

        let mut meta = UnitMeta::new(id, doc.slug.clone(), literal.clone());
        meta.domain = Some(
            doc.meta
                .domain
                .clone()
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
        );
        meta.status = Some(
            doc.meta
                .status
                .clone()
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        );
        units.push(AtomicUnit {
            meta,
            body: render_unit_body(&rules.article_label, literal, digits, content),
        });
    }

    let parent_body = excise_section(text, &section);
    let parent_meta = parent_meta(doc, &units);
    Ok(Segmentation {
        parent_meta,
        parent_body,
        units,
        boundary_line: section.heading_line,
        notes,
    })
}

fn render_unit_body(label: &str, literal: &str, digits: &str, content: &str) -> String {
    format!("# {label} {literal}\n{content} {{#art-{digits}}}")
}

fn excise_section(text: &str, section: &ArticleSection) -> String {
    let mut body = String::with_capacity(text.len());
    body.push_str(&text[..section.start]);
    body.push_str(INDEX_PLACEHOLDER);
    let rest = &text[section.end..];
    if !rest.is_empty() {
        body.push_str("\n\n");
        body.push_str(rest);
    }
    body
}

fn parent_meta(doc: &Document, units: &[AtomicUnit]) -> DocumentMeta {
    let mut meta = doc.meta.clone();
    meta.doc = Some(doc.slug.clone());
    let first = units.first().and_then(|unit| unit.meta.article_number.clone());
    let last = units.last().and_then(|unit| unit.meta.article_number.clone());
    if let (Some(first), Some(last)) = (first, last) {
        meta.articles = Some(format!("{first}-{last}"));
    }
    if meta.summary.is_none() {
        meta.summary = Some(DEFAULT_PARENT_SUMMARY.to_string());
    }
    if meta.source.is_none() {
        meta.source = doc
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }
    meta
}
