//! Fallback metadata read from the document's "legislation card".
//!
//! Scanned sources often carry their attributes as a bullet list in the body
//! (`- **النوع**: نظام`) rather than in front matter. Declared front matter
//! always wins; the card only fills gaps.
use crate::model::DocumentMeta;
use anyhow::Result;
use regex::Regex;

use super::lexer::parse_heading;

/// Attributes found on the card.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CardFields {
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub issuance_date: Option<String>,
}

/// Scan `text` for card bullet lines.
pub fn parse_card(text: &str) -> Result<CardFields> {
    let type_re = Regex::new(r"(?m)^\s*-\s*\*\*النوع\*\*\s*:\s*(.+?)\s*$")?;
    let status_re = Regex::new(r"(?m)^\s*-\s*\*\*الحالة\*\*\s*:\s*(.+?)\s*$")?;
    // The date line pairs the hijri and gregorian dates around "الموافق".
    let date_re = Regex::new(r"(?m)^\s*-\s*\*\*التاريخ\*\*\s*:\s*(.+?)\s+الموافق")?;

    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|found| found.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    };

    Ok(CardFields {
        doc_type: capture(&type_re),
        status: capture(&status_re),
        issuance_date: capture(&date_re)
            .and_then(|date| date.split_whitespace().next().map(str::to_string)),
    })
}

/// Fill missing metadata from the card and the first level-1 heading.
pub fn apply_fallbacks(meta: &mut DocumentMeta, text: &str) -> Result<()> {
    let card = parse_card(text)?;
    if meta.doc_type.is_none() {
        meta.doc_type = card.doc_type;
    }
    if meta.status.is_none() {
        meta.status = card.status;
    }
    if meta.issuance_date.is_none() {
        meta.issuance_date = card.issuance_date;
    }
    if meta.title.is_none() {
        meta.title = first_title(text);
    }
    Ok(())
}

fn first_title(text: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| parse_heading(line.trim()))
        .find(|(level, title)| *level == 1 && !title.is_empty())
        .map(|(_, title)| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = "# نظام العمل\n\n## بطاقة التشريع\n- **النوع**: نظام\n- **الحالة**: ساري\n- **التاريخ**: 1426/08/23 هـ الموافق 2005/09/27 م\n";

    #[test]
    fn reads_card_bullets() {
        let card = parse_card(CARD).unwrap();
        assert_eq!(card.doc_type.as_deref(), Some("نظام"));
        assert_eq!(card.status.as_deref(), Some("ساري"));
        assert_eq!(card.issuance_date.as_deref(), Some("1426/08/23"));
    }

    #[test]
    fn declared_metadata_wins_over_card() {
        let mut meta = DocumentMeta {
            doc_type: Some("قانون".into()),
            ..Default::default()
        };
        apply_fallbacks(&mut meta, CARD).unwrap();
        assert_eq!(meta.doc_type.as_deref(), Some("قانون"));
        assert_eq!(meta.status.as_deref(), Some("ساري"));
        assert_eq!(meta.title.as_deref(), Some("نظام العمل"));
    }

    #[test]
    fn missing_card_leaves_fields_empty() {
        let mut meta = DocumentMeta::default();
        apply_fallbacks(&mut meta, "نص بلا بطاقة").unwrap();
        assert_eq!(meta, DocumentMeta::default());
    }
}
