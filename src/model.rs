//! Record types shared by the segmenter, linker and enrichment stages.
//!
//! Metadata blocks are typed on the fields the pipeline relies on and keep
//! every other declared key in an ordered `extra` bag so files written by
//! other tools survive a rewrite untouched.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::slug;

/// `type` value written on every unit record.
pub const UNIT_KIND: &str = "مادة";

/// Domain inherited by units when the document declares none.
pub const DEFAULT_DOMAIN: &str = "غير مصنف";

/// Status inherited by units when the document declares none.
pub const DEFAULT_STATUS: &str = "قيد التطبيق";

/// Summary kept on a unit until the analysis service provides one.
pub const DEFAULT_UNIT_SUMMARY: &str = "تم تحديث الملخص بواسطة LLM.";

/// Summary written on the parent record when the document declares none.
pub const DEFAULT_PARENT_SUMMARY: &str = "النصوص التمهيدية والديباجة.";

/// Two-way classification of an article, plus the unknown state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    #[serde(alias = "إجرائي")]
    Procedural,
    #[serde(alias = "موضوعي")]
    Substantive,
    #[default]
    #[serde(alias = "غير مصنف")]
    Unclassified,
}

impl Aspect {
    /// Return the stable label used in unit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Procedural => "procedural",
            Aspect::Substantive => "substantive",
            Aspect::Unclassified => "unclassified",
        }
    }

    /// Map a free-form label from the analysis service onto an aspect.
    ///
    /// Anything that is neither procedural nor substantive is unclassified.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().trim_matches(|ch: char| ch == '\'' || ch == '"');
        let lower = label.to_lowercase();
        if label.contains("إجرائي") || lower.starts_with("procedural") {
            Aspect::Procedural
        } else if label.contains("موضوعي") || lower.starts_with("substantive") {
            Aspect::Substantive
        } else {
            Aspect::Unclassified
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared attributes of a source document, also used for the parent record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(
        rename = "النوع",
        alias = "type",
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub doc_type: Option<String>,
    #[serde(
        rename = "الرقم",
        alias = "number",
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,
    #[serde(
        rename = "الحالة",
        alias = "status",
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub domain: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub issuance_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub doc: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub articles: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Metadata block of one atomic unit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitMeta {
    pub id: String,
    pub doc: String,
    #[serde(rename = "type", default = "default_unit_kind")]
    pub kind: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub domain: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub status: Option<String>,
    #[serde(rename = "articles", default, deserialize_with = "optional_scalar")]
    pub article_number: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<Aspect>,
    #[serde(
        default,
        deserialize_with = "optional_corrections",
        skip_serializing_if = "Option::is_none"
    )]
    pub ocr_corrections: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Mapping,
}

fn default_unit_kind() -> String {
    UNIT_KIND.to_string()
}

impl UnitMeta {
    /// Create the metadata for a freshly segmented unit.
    pub fn new(id: String, doc: String, article_number: String) -> Self {
        Self {
            id,
            doc,
            kind: default_unit_kind(),
            domain: None,
            status: None,
            article_number: Some(article_number),
            prev: None,
            next: None,
            summary: None,
            keywords: None,
            aspect: None,
            ocr_corrections: None,
            extra: Mapping::new(),
        }
    }

    /// Numeric sort key: the declared article number, else the id suffix.
    ///
    /// Returns `None` when neither yields a number.
    pub fn sort_key(&self) -> Option<u32> {
        self.article_number
            .as_deref()
            .and_then(parse_article_number)
            .or_else(|| slug::article_number_from_id(&self.id))
    }

    /// Article number for review records, falling back to the id suffix.
    pub fn article_label(&self) -> String {
        if let Some(number) = self.article_number.as_deref() {
            return number.to_string();
        }
        self.id
            .rsplit_once(slug::UNIT_ID_SEPARATOR)
            .map(|(_, suffix)| suffix.to_string())
            .unwrap_or_default()
    }
}

/// One article as held in memory: its metadata block and literal body.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicUnit {
    pub meta: UnitMeta,
    pub body: String,
}

impl AtomicUnit {
    pub fn id(&self) -> &str {
        &self.meta.id
    }
}

/// A source document after its front matter has been read.
#[derive(Debug, Clone)]
pub struct Document {
    pub slug: String,
    pub source_path: PathBuf,
    pub meta: DocumentMeta,
    /// Full text following the front matter.
    pub text: String,
}

/// Parse an article number written with ASCII or Arabic-Indic digits.
pub fn parse_article_number(raw: &str) -> Option<u32> {
    let ascii = ascii_digits(raw.trim())?;
    ascii.parse().ok()
}

/// Normalize a run of decimal digits to ASCII.
///
/// Returns `None` if any character is not a supported digit.
pub fn ascii_digits(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    raw.chars().map(digit_value).collect::<Option<String>>()
}

/// Value of one decimal digit in the ASCII, Arabic-Indic or Extended
/// Arabic-Indic ranges.
pub fn digit_value(ch: char) -> Option<char> {
    let offset = match ch {
        '0'..='9' => ch as u32 - '0' as u32,
        '\u{0660}'..='\u{0669}' => ch as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => ch as u32 - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, got {other:?}"
        ))),
    }
}

// Older unit files stored corrections as a list; both shapes load as a map.
fn optional_corrections<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };
    let mut corrections = BTreeMap::new();
    match value {
        Value::Null => return Ok(None),
        Value::Mapping(map) => {
            for (key, value) in map {
                let (Some(key), Some(value)) = (scalar_text(&key), scalar_text(&value)) else {
                    return Err(D::Error::custom("ocr_corrections entries must be scalars"));
                };
                corrections.insert(key, value);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                let original = item.get("original_word").and_then(scalar_text);
                let suggested = item.get("suggested_correction").and_then(scalar_text);
                if let (Some(original), Some(suggested)) = (original, suggested) {
                    corrections.insert(original, suggested);
                }
            }
        }
        other => {
            return Err(D::Error::custom(format!(
                "ocr_corrections must be a mapping, got {other:?}"
            )))
        }
    }
    Ok(Some(corrections))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_accepts_arabic_and_english_labels() {
        assert_eq!(Aspect::from_label("إجرائي"), Aspect::Procedural);
        assert_eq!(Aspect::from_label("'موضوعي'"), Aspect::Substantive);
        assert_eq!(Aspect::from_label("Procedural"), Aspect::Procedural);
        assert_eq!(Aspect::from_label("mixed"), Aspect::Unclassified);
    }

    #[test]
    fn aspect_deserializes_arabic_alias() {
        let aspect: Aspect = serde_yaml::from_str("موضوعي").unwrap();
        assert_eq!(aspect, Aspect::Substantive);
        let aspect: Aspect = serde_yaml::from_str("procedural").unwrap();
        assert_eq!(aspect, Aspect::Procedural);
    }

    #[test]
    fn parse_article_number_handles_arabic_indic_digits() {
        assert_eq!(parse_article_number("12"), Some(12));
        assert_eq!(parse_article_number("١٢"), Some(12));
        assert_eq!(parse_article_number("۳"), Some(3));
        assert_eq!(parse_article_number("3a"), None);
        assert_eq!(parse_article_number(""), None);
    }

    #[test]
    fn document_meta_reads_numeric_scalars_and_keeps_extras() {
        let yaml = "النوع: قانون\nالرقم: 13\nجهة الإصدار: مجلس\ndomain: عمل\n";
        let meta: DocumentMeta = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.doc_type.as_deref(), Some("قانون"));
        assert_eq!(meta.number.as_deref(), Some("13"));
        assert_eq!(meta.domain.as_deref(), Some("عمل"));
        assert_eq!(
            meta.extra.get("جهة الإصدار").and_then(Value::as_str),
            Some("مجلس")
        );
    }

    #[test]
    fn unit_meta_loads_legacy_list_corrections() {
        let yaml = "id: d--مادة-001\ndoc: d\narticles: '1'\nocr_corrections: []\n";
        let meta: UnitMeta = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.ocr_corrections, Some(BTreeMap::new()));
        assert_eq!(meta.kind, UNIT_KIND);
        assert_eq!(meta.sort_key(), Some(1));
    }

    #[test]
    fn sort_key_falls_back_to_id_suffix() {
        let mut meta = UnitMeta::new("d--مادة-004".into(), "d".into(), "x".into());
        assert_eq!(meta.sort_key(), Some(4));
        meta.id = "d".into();
        assert_eq!(meta.sort_key(), None);
    }
}
