//! Line tokenizer for source documents.
//!
//! Every line becomes exactly one token carrying its 1-based line number and
//! byte span, so the segmenter can cut the original text without re-scanning
//! and report precise locations when a document is malformed.
use crate::model::ascii_digits;

/// Classification of a single source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Markdown ATX heading (`#` through `######`).
    Heading { level: usize, text: String },
    /// Bolded article marker such as `**المادة 12**`.
    ArticleMarker {
        /// Number as written in the source.
        literal: String,
        /// Same number with ASCII digits.
        digits: String,
    },
    Text { blank: bool },
}

/// One tokenized line with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset just past the line terminator.
    pub end: usize,
    pub kind: TokenKind,
}

impl Line {
    pub fn is_heading_at_most(&self, max_level: usize) -> bool {
        matches!(self.kind, TokenKind::Heading { level, .. } if level <= max_level)
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.kind, TokenKind::ArticleMarker { .. })
    }
}

/// Tokenize `text`, recognizing article markers that use `article_label`.
pub fn tokenize(text: &str, article_label: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        let content = raw.trim_end_matches(['\n', '\r']);
        lines.push(Line {
            number: idx + 1,
            start,
            end: offset,
            kind: classify(content, article_label),
        });
    }
    lines
}

fn classify(content: &str, article_label: &str) -> TokenKind {
    let trimmed = content.trim();
    if let Some((level, text)) = parse_heading(trimmed) {
        return TokenKind::Heading {
            level,
            text: text.to_string(),
        };
    }
    if let Some((literal, digits)) = parse_marker(trimmed, article_label) {
        return TokenKind::ArticleMarker { literal, digits };
    }
    TokenKind::Text {
        blank: trimmed.is_empty(),
    }
}

/// Split an ATX heading into its level and trimmed text.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|byte| *byte == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim()))
}

fn parse_marker(line: &str, article_label: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix("**")?.strip_suffix("**")?;
    labelled_number(inner.trim(), article_label)
}

/// Read `{label} N` and return the literal number with its ASCII form.
pub fn labelled_number(text: &str, article_label: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix(article_label)?.trim();
    let digits = ascii_digits(rest)?;
    Some((rest.to_string(), digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "المادة";

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, LABEL).into_iter().map(|line| line.kind).collect()
    }

    #[test]
    fn recognizes_markers_with_loose_spacing() {
        let tokens = kinds("**المادة 1**\n** المادة   12 **\n**المادة٣**\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::ArticleMarker {
                    literal: "1".into(),
                    digits: "1".into()
                },
                TokenKind::ArticleMarker {
                    literal: "12".into(),
                    digits: "12".into()
                },
                TokenKind::ArticleMarker {
                    literal: "٣".into(),
                    digits: "3".into()
                },
            ]
        );
    }

    #[test]
    fn rejects_markers_that_are_not_whole_lines() {
        let tokens = kinds("نص **المادة 1** نص\n**المادة الأولى**\n**المادة 1\n");
        assert!(tokens
            .iter()
            .all(|kind| matches!(kind, TokenKind::Text { blank: false })));
    }

    #[test]
    fn headings_need_a_space_after_hashes() {
        assert_eq!(parse_heading("## النص الكامل"), Some((2, "النص الكامل")));
        assert_eq!(parse_heading("#"), Some((1, "")));
        assert_eq!(parse_heading("#hashtag"), None);
        assert_eq!(parse_heading("####### seven"), None);
    }

    #[test]
    fn spans_cover_the_whole_text() {
        let text = "a\r\n\n## b\nc";
        let lines = tokenize(text, LABEL);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].end, 3);
        assert_eq!(lines.last().map(|line| line.end), Some(text.len()));
        assert_eq!(lines[1].kind, TokenKind::Text { blank: true });
        assert!(lines[2].is_heading_at_most(2));
        assert_eq!(lines[3].number, 4);
    }
}
