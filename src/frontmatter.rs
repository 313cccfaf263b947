//! Reader and writer for `---` delimited YAML metadata blocks.
//!
//! Writers always re-serialize the whole block, so key order follows the
//! record type rather than whatever was on disk.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

const DELIMITER: &str = "---";

/// Split a file into its raw metadata block (if any) and the remaining body.
pub fn split(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = strip_delimiter_line(content) else {
        return (None, content);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(block), body);
        }
        offset += line.len();
    }
    (None, content)
}

fn strip_delimiter_line(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(DELIMITER)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

/// Parse a metadata block and return it with the body text.
///
/// Files without a block yield `None` and the full content as body.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<(Option<T>, String)> {
    let (block, body) = split(content);
    let Some(block) = block else {
        return Ok((None, body.to_string()));
    };
    let source = if block.trim().is_empty() { "{}" } else { block };
    let meta = serde_yaml::from_str(source).context("parse metadata block")?;
    Ok((Some(meta), body.to_string()))
}

/// Render a metadata block followed by the trimmed body.
pub fn render<T: Serialize>(meta: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(meta).context("serialize metadata block")?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body.trim());
    Ok(out)
}

/// Read a record file that must carry a metadata block.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<(T, String)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let (meta, body) =
        parse(&content).with_context(|| format!("parse metadata in {}", path.display()))?;
    let meta = meta.with_context(|| format!("{} has no metadata block", path.display()))?;
    Ok((meta, body))
}

/// Write a record file, replacing any previous content.
pub fn write_record<T: Serialize>(path: &Path, meta: &T, body: &str) -> Result<()> {
    let text = render(meta, body)?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
}
