//! `alu split`: segment every source document into a document folder.
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifacts::{write_manifest, BuildLog, Manifest};
use crate::cli::SplitArgs;
use crate::link;
use crate::paths::OutputPaths;
use crate::segment::{self, SegmentRules};
use crate::store;
use crate::util::display_path;

use super::load_settings;

/// Tally of one split pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Slugs of documents that produced units.
    pub split: Vec<String>,
    /// Source files that could not be split, with the reason.
    pub failed: Vec<(String, String)>,
    pub units: usize,
}

pub fn run_split(args: &SplitArgs) -> Result<()> {
    let config = load_settings(args.config.as_deref())?;
    split_all(&args.input, &args.output, &config.segment_rules())?;
    Ok(())
}

/// Split every `*.md` file in `input` into folders under `output`.
///
/// A document with structural problems is reported and skipped; the rest of
/// the batch continues. So is a source whose slug an earlier file of the
/// batch already produced.
pub fn split_all(input: &Path, output: &Path, rules: &SegmentRules) -> Result<SplitSummary> {
    let started = Instant::now();
    let sources = source_files(input)?;
    fs::create_dir_all(output).with_context(|| format!("create {}", output.display()))?;
    let output = OutputPaths::new(output.to_path_buf());
    println!("splitting {} document(s) from {}", sources.len(), input.display());

    let mut summary = SplitSummary::default();
    // slug -> source file that claimed its folder
    let mut claimed = BTreeMap::new();
    for source in &sources {
        let name = display_path(source, Some(input));
        match split_document(source, &output, rules, &mut claimed) {
            Ok(SplitResult::Split { slug, units }) => {
                println!("  {name} -> {slug} ({units} unit(s))");
                summary.units += units;
                summary.split.push(slug);
            }
            Ok(SplitResult::Rejected { reason }) => {
                println!("  {name}: skipped ({reason})");
                summary.failed.push((name, reason));
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::error!(source = %name, error = %reason, "split failed");
                println!("  {name}: failed ({reason})");
                summary.failed.push((name, reason));
            }
        }
    }

    println!(
        "split {} document(s), {} unit(s), {} skipped",
        summary.split.len(),
        summary.units,
        summary.failed.len()
    );
    tracing::info!(
        documents = summary.split.len(),
        units = summary.units,
        failed = summary.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "split finished"
    );
    Ok(summary)
}

enum SplitResult {
    Split { slug: String, units: usize },
    Rejected { reason: String },
}

fn split_document(
    source: &Path,
    output: &OutputPaths,
    rules: &SegmentRules,
    claimed: &mut BTreeMap<String, String>,
) -> Result<SplitResult> {
    let mut log = BuildLog::new();
    let doc = segment::load_document(source)?;
    let paths = output.document(&doc.slug);
    let source_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    log.step(format!("Read {} as document `{}`.", source_name, doc.slug));

    if let Some(owner) = claimed.get(&doc.slug) {
        let reason = format!("slug `{}` already produced by {owner}", doc.slug);
        tracing::warn!(
            doc = %doc.slug,
            source = %source_name,
            owner = %owner,
            "duplicate slug rejected"
        );
        log.step(format!("Rejected: {reason}."));
        log.append(&paths.build_log_path())?;
        return Ok(SplitResult::Rejected { reason });
    }
    claimed.insert(doc.slug.clone(), source_name.clone());
    fs::create_dir_all(paths.dir())
        .with_context(|| format!("create {}", paths.dir().display()))?;

    let mut segmentation = match segment::segment(&doc, rules) {
        Ok(segmentation) => segmentation,
        Err(err) => {
            tracing::warn!(doc = %doc.slug, error = %err, "document structure rejected");
            log.step(format!("Rejected: {err}."));
            log.write(&paths.build_log_path())?;
            return Ok(SplitResult::Rejected {
                reason: err.to_string(),
            });
        }
    };
    log.step(format!(
        "Found article section `## {}` at line {}.",
        rules.boundary_heading, segmentation.boundary_line
    ));
    for note in &segmentation.notes {
        tracing::warn!(doc = %doc.slug, "{note}");
        log.detail(note);
    }

    log.step(format!(
        "Split {} article(s) on `**{} N**` markers.",
        segmentation.units.len(),
        rules.article_label
    ));
    for id in link::link_units(&mut segmentation.units) {
        log.detail(format!("{id} has no numeric article number; sorted first."));
    }
    let unit_paths: Vec<PathBuf> = segmentation
        .units
        .iter()
        .map(|unit| paths.unit_path(unit.id()))
        .collect();
    for stale in store::remove_stale_units(&paths, &unit_paths)? {
        log.detail(format!(
            "Removed {} left from an earlier split.",
            display_path(&stale, Some(paths.dir()))
        ));
    }
    for (unit, path) in segmentation.units.iter().zip(&unit_paths) {
        store::save_unit(path, unit)?;
    }
    log.step(format!(
        "Linked and wrote {} unit file(s).",
        segmentation.units.len()
    ));

    store::save_parent(&paths, &segmentation.parent_meta, &segmentation.parent_body)?;
    log.step(format!(
        "Wrote parent record {} with the article index placeholder.",
        paths.parent_file_name()
    ));

    let manifest = Manifest::new(&paths, Some(source_name), &segmentation.units);
    write_manifest(&paths, &manifest)?;
    log.step(format!(
        "Wrote manifest {}.",
        display_path(&paths.manifest_path(), Some(paths.dir()))
    ));
    log.write(&paths.build_log_path())?;

    Ok(SplitResult::Split {
        slug: doc.slug,
        units: segmentation.units.len(),
    })
}

/// Source documents in `input`, sorted by file name.
fn source_files(input: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(input).with_context(|| format!("read {}", input.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", input.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
