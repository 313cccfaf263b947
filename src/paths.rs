//! Typed paths into the output layout.
//!
//! Centralizing path construction keeps file access consistent across the
//! split, link and enrich stages.
use std::path::{Path, PathBuf};

use crate::slug::UNIT_ID_SEPARATOR;

/// Output root holding one folder per document.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    root: PathBuf,
}

impl OutputPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding every artifact of one document.
    pub fn document(&self, slug: &str) -> DocPaths {
        DocPaths::new(self.root.join(slug), slug.to_string())
    }

    /// Return the `run_report.json` path.
    pub fn run_report_path(&self) -> PathBuf {
        self.root.join("run_report.json")
    }
}

/// Artifacts of a single document folder.
#[derive(Debug, Clone)]
pub struct DocPaths {
    dir: PathBuf,
    slug: String,
}

impl DocPaths {
    pub fn new(dir: PathBuf, slug: String) -> Self {
        Self { dir, slug }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Return the `{slug}.md` parent record path.
    pub fn parent_path(&self) -> PathBuf {
        self.dir.join(self.parent_file_name())
    }

    pub fn parent_file_name(&self) -> String {
        format!("{}.md", self.slug)
    }

    /// Return the `{id}.md` path for a unit.
    pub fn unit_path(&self, unit_id: &str) -> PathBuf {
        self.dir.join(unit_file_name(unit_id))
    }

    /// Return the `{slug}.manifest.json` path.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}.manifest.json", self.slug))
    }

    /// Return the `{slug}.build.log` path.
    pub fn build_log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.build.log", self.slug))
    }

    /// Return the `{slug}.ocr_review.json` path.
    pub fn review_path(&self) -> PathBuf {
        self.dir.join(format!("{}.ocr_review.json", self.slug))
    }

    /// Return the `{slug}.enrich_log.jsonl` path.
    pub fn enrich_log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.enrich_log.jsonl", self.slug))
    }

    /// Prefix shared by every unit file name of this document.
    pub fn unit_file_prefix(&self) -> String {
        format!("{}{UNIT_ID_SEPARATOR}", self.slug)
    }
}

/// File name used for a unit record.
pub fn unit_file_name(unit_id: &str) -> String {
    format!("{unit_id}.md")
}
