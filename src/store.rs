//! Persistence of unit and parent records inside a document folder.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::frontmatter;
use crate::model::{AtomicUnit, DocumentMeta, UnitMeta};
use crate::paths::{DocPaths, OutputPaths};

/// A unit loaded from disk together with the file it came from.
#[derive(Debug, Clone)]
pub struct UnitFile {
    pub path: PathBuf,
    pub unit: AtomicUnit,
}

pub fn load_unit(path: &Path) -> Result<AtomicUnit> {
    let (meta, body) = frontmatter::read_record::<UnitMeta>(path)?;
    Ok(AtomicUnit {
        meta,
        body: body.trim().to_string(),
    })
}

/// Rewrite a unit file with its full metadata block.
pub fn save_unit(path: &Path, unit: &AtomicUnit) -> Result<()> {
    frontmatter::write_record(path, &unit.meta, &unit.body)
}

pub fn save_parent(paths: &DocPaths, meta: &DocumentMeta, body: &str) -> Result<PathBuf> {
    let path = paths.parent_path();
    frontmatter::write_record(&path, meta, body)?;
    Ok(path)
}

/// List unit files of a document, sorted by file name.
pub fn unit_file_paths(paths: &DocPaths) -> Result<Vec<PathBuf>> {
    let prefix = paths.unit_file_prefix();
    let mut found = Vec::new();
    let entries =
        fs::read_dir(paths.dir()).with_context(|| format!("read {}", paths.dir().display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", paths.dir().display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && name.ends_with(".md") && entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Units of a document folder plus the files that could not be parsed.
#[derive(Debug, Default)]
pub struct UnitScan {
    pub files: Vec<UnitFile>,
    pub unreadable: Vec<PathBuf>,
}

/// Load every readable unit of a document.
///
/// Files whose metadata cannot be parsed are listed in `unreadable` instead
/// of failing the whole folder.
pub fn load_units(paths: &DocPaths) -> Result<UnitScan> {
    let mut scan = UnitScan::default();
    for path in unit_file_paths(paths)? {
        match load_unit(&path) {
            Ok(unit) => scan.files.push(UnitFile { path, unit }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "skip unreadable unit");
                scan.unreadable.push(path);
            }
        }
    }
    Ok(scan)
}

/// Delete unit files of a document that are not in `keep`.
///
/// Returns the removed paths.
pub fn remove_stale_units(paths: &DocPaths, keep: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in unit_file_paths(paths)? {
        if keep.contains(&path) {
            continue;
        }
        fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        tracing::debug!(path = %path.display(), "removed stale unit");
        removed.push(path);
    }
    Ok(removed)
}

/// Find document folders under the output root.
///
/// A folder counts when it holds a manifest or at least one unit file named
/// after the folder.
pub fn discover_documents(output: &OutputPaths) -> Result<Vec<DocPaths>> {
    let root = output.root();
    let entries = fs::read_dir(root).with_context(|| format!("read {}", root.display()))?;
    let mut docs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", root.display()))?;
        if !entry.path().is_dir() {
            continue;
        }
        let slug = entry.file_name().to_string_lossy().into_owned();
        let paths = output.document(&slug);
        if paths.manifest_path().is_file() || !unit_file_paths(&paths)?.is_empty() {
            docs.push(paths);
        }
    }
    docs.sort_by(|a, b| a.slug().cmp(b.slug()));
    Ok(docs)
}
