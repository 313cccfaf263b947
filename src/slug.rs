//! Filesystem-safe identifiers for documents and units.
//!
//! Slugs keep letters of any script and digits, join everything else with a
//! single underscore, and never contain path separators.

/// Prefix used for documents without a declared number.
pub const GENERIC_DOC_PREFIX: &str = "وثيقة";

/// Separator between a document slug and the per-article suffix.
pub const UNIT_ID_SEPARATOR: &str = "--مادة-";

/// Width used when zero-padding article numbers inside unit ids.
pub const ARTICLE_NUMBER_WIDTH: usize = 3;

/// Turn arbitrary text into an identifier made of letters, digits and `_`.
///
/// Parentheses are dropped outright so `قانون (معدل)` reads `قانون_معدل`
/// rather than gaining stray separators.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_separator = false;
    for ch in text.chars() {
        if matches!(ch, '(' | ')') {
            continue;
        }
        if ch.is_alphanumeric() || is_combining_mark(ch) {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(ch);
        } else {
            pending_separator = true;
        }
    }
    out
}

// Arabic harakat and similar marks belong to the preceding letter.
fn is_combining_mark(ch: char) -> bool {
    matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}')
}

/// Build the document slug from its declared type/number and file name.
///
/// Documents without a usable number fall back to the generic prefix so the
/// slug still depends only on stable inputs.
pub fn document_slug(doc_type: Option<&str>, number: Option<&str>, file_stem: &str) -> String {
    let stem = slugify(file_stem);
    let number = number.map(str::trim).unwrap_or_default();
    if number.is_empty() || number == "0" {
        return format!("{GENERIC_DOC_PREFIX}-{stem}");
    }
    let doc_type = doc_type
        .map(slugify)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| GENERIC_DOC_PREFIX.to_string());
    format!("{doc_type}-{stem}")
}

/// Zero-pad an ASCII article number to the unit id width.
pub fn pad_article_number(number: &str) -> String {
    format!("{number:0>width$}", width = ARTICLE_NUMBER_WIDTH)
}

/// Compose a unit id from the document slug and the article number.
pub fn unit_id(doc_slug: &str, article_number: &str) -> String {
    format!(
        "{doc_slug}{UNIT_ID_SEPARATOR}{}",
        pad_article_number(article_number)
    )
}

/// Read the numeric article suffix back out of a unit id.
///
/// Only the leading digits count, so disambiguated ids such as `005_2` still
/// yield `5`.
pub fn article_number_from_id(id: &str) -> Option<u32> {
    let (_, suffix) = id.rsplit_once(UNIT_ID_SEPARATOR)?;
    let digits: String = suffix.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
