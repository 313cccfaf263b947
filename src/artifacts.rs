//! Per-document side artifacts: the manifest and the build log.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::model::AtomicUnit;
use crate::paths::{unit_file_name, DocPaths};

/// Listing of every file produced for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub doc: String,
    pub parent_file: String,
    /// File name of the source document inside the input folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default)]
    pub alus: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub file: String,
}

impl Manifest {
    pub fn new(paths: &DocPaths, source_file: Option<String>, units: &[AtomicUnit]) -> Self {
        Self {
            doc: paths.slug().to_string(),
            parent_file: paths.parent_file_name(),
            source_file,
            alus: units
                .iter()
                .map(|unit| ManifestEntry {
                    id: unit.id().to_string(),
                    file: unit_file_name(unit.id()),
                })
                .collect(),
        }
    }
}

pub fn write_manifest(paths: &DocPaths, manifest: &Manifest) -> Result<()> {
    let path = paths.manifest_path();
    let text = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read the manifest of a document folder, if one was written.
pub fn read_manifest(paths: &DocPaths) -> Result<Option<Manifest>> {
    let path = paths.manifest_path();
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let manifest =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(manifest))
}

/// Ordered description of the steps taken while splitting one document.
#[derive(Debug, Default, Clone)]
pub struct BuildLog {
    entries: Vec<String>,
    steps: usize,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a numbered step.
    pub fn step(&mut self, text: impl AsRef<str>) {
        self.steps += 1;
        self.entries.push(format!("{}. {}", self.steps, text.as_ref()));
    }

    /// Record a detail line under the current step.
    pub fn detail(&mut self, text: impl AsRef<str>) {
        self.entries.push(format!("  - {}", text.as_ref()));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render().as_bytes())
            .with_context(|| format!("write {}", path.display()))
    }

    /// Add these entries after an existing log instead of replacing it.
    pub fn append(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open build log for append: {}", path.display()))?;
        file.write_all(self.render().as_bytes())
            .with_context(|| format!("write {}", path.display()))
    }

    fn render(&self) -> String {
        let mut text = self.entries.join("\n");
        text.push('\n');
        text
    }
}
