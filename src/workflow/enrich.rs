//! `alu enrich`: link and analyze every split document.
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

use crate::analysis::{AnalysisError, AnalysisService};
use crate::artifacts::read_manifest;
use crate::cli::EnrichArgs;
use crate::config::PipelineConfig;
use crate::context::{load_context, locate_source, DocumentContext};
use crate::enrich::enrich_document;
use crate::frontmatter;
use crate::ledger::DocumentLedger;
use crate::model::DocumentMeta;
use crate::paths::{DocPaths, OutputPaths};
use crate::segment::SegmentRules;
use crate::store;

use super::report::{write_run_report, RunReport, RunStatus};
use super::{build_service, resolve_config};

pub fn run_enrich(args: &EnrichArgs) -> Result<()> {
    let config = resolve_config(&args.settings)?;
    let service = build_service(&config)?;
    enrich_all(&args.input, &args.output, &config, service.as_ref())?;
    Ok(())
}

/// Enrich every document folder under `output`.
///
/// Document failures are recorded and skipped. An authorization failure
/// stops the run; the report is still written before the error is returned.
pub fn enrich_all(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    service: &dyn AnalysisService,
) -> Result<RunReport> {
    let started = Instant::now();
    let output = OutputPaths::new(output.to_path_buf());
    let docs = store::discover_documents(&output)?;
    let rules = config.segment_rules();
    let policy = config.retry_policy();
    println!("enriching {} document(s) in {}", docs.len(), output.root().display());

    let mut report = RunReport::new();
    let mut abort = None;
    for paths in &docs {
        println!("{}", paths.slug());
        let context = document_context(input, paths, &rules, config.context_max_chars);
        let mut ledger = DocumentLedger::new(paths.slug());
        let result = enrich_document(paths, &context, service, &policy, &mut ledger);
        let tokens = ledger.total;
        report.tokens.absorb(ledger);
        match result {
            Ok(outcome) => {
                if let Some(path) = &outcome.review_path {
                    println!("  review: {}", path.display());
                }
                report.record(&outcome, tokens);
            }
            Err(err) if is_authorization(&err) => {
                report.fail(paths.slug(), format!("{err:#}"));
                abort = Some(err);
                break;
            }
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::error!(doc = %paths.slug(), error = %reason, "document failed");
                println!("  failed: {reason}");
                report.fail(paths.slug(), reason);
            }
        }
    }

    if abort.is_some() {
        report.status = RunStatus::Aborted;
    }
    write_run_report(&output, &mut report)?;
    report.print_summary();
    tracing::info!(
        documents = report.documents.len(),
        failed = report.failed.len(),
        input_tokens = report.tokens.total.input_tokens,
        output_tokens = report.tokens.total.output_tokens,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "enrich finished"
    );
    match abort {
        Some(err) => Err(err).context("analysis credentials rejected; run aborted"),
        None => Ok(report),
    }
}

/// True when `err` wraps rejected analysis credentials.
pub fn is_authorization(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::Authorization(_))
    )
}

fn document_context(
    input: &Path,
    paths: &DocPaths,
    rules: &SegmentRules,
    max_bytes: usize,
) -> DocumentContext {
    let manifest = match read_manifest(paths) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!(doc = %paths.slug(), error = %format!("{err:#}"), "ignoring unreadable manifest");
            None
        }
    };
    let parent = parent_meta(paths);
    let source = locate_source(input, paths.slug(), manifest.as_ref(), parent.as_ref());
    match load_context(source.as_deref(), rules, max_bytes) {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!(doc = %paths.slug(), error = %format!("{err:#}"), "source unreadable; enriching without context");
            DocumentContext::NoContext
        }
    }
}

fn parent_meta(paths: &DocPaths) -> Option<DocumentMeta> {
    let path = paths.parent_path();
    if !path.is_file() {
        return None;
    }
    match frontmatter::read_record::<DocumentMeta>(&path) {
        Ok((meta, _)) => Some(meta),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %format!("{err:#}"), "parent record unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisOutcome, AnalysisRequest, AnalysisResponse};
    use crate::config::default_config;
    use crate::ledger::TokenUsage;
    use crate::workflow::split_all;
    use std::cell::Cell;
    use std::fs;

    /// Accepts the first `allowed` calls, then rejects credentials.
    struct Gate {
        allowed: usize,
        calls: Cell<usize>,
    }

    impl AnalysisService for Gate {
        fn analyze(
            &self,
            request: &AnalysisRequest<'_>,
        ) -> Result<AnalysisOutcome, AnalysisError> {
            assert!(request.context.is_some());
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call >= self.allowed {
                return Err(AnalysisError::Authorization("key rejected".into()));
            }
            Ok(AnalysisOutcome {
                response: AnalysisResponse::default(),
                usage: TokenUsage::new(4, 1),
            })
        }
    }

    fn source(title: &str) -> String {
        format!("# {title}\n\n## النص الكامل للمواد\n\n**المادة 1**\nأ.\n\n**المادة 2**\nب.\n")
    }

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.md"), source("أ")).unwrap();
        fs::write(input.join("b.md"), source("ب")).unwrap();
        split_all(&input, &output, &SegmentRules::default()).unwrap();
        (dir, input, output)
    }

    fn config() -> PipelineConfig {
        let mut config = default_config();
        config.retry_delay_secs = 0;
        config
    }

    #[test]
    fn enriches_every_document_and_writes_report() {
        let (_dir, input, output) = fixture();
        let service = Gate {
            allowed: usize::MAX,
            calls: Cell::new(0),
        };
        let report = enrich_all(&input, &output, &config(), &service).unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.enriched, 4);
        assert!(report.documents.iter().all(|doc| doc.context_available));
        assert_eq!(report.tokens.total, TokenUsage::new(16, 4));

        let text = fs::read_to_string(output.join("run_report.json")).unwrap();
        let written: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(written.enriched, 4);
    }

    #[test]
    fn authorization_stops_later_documents() {
        let (_dir, input, output) = fixture();
        let service = Gate {
            allowed: 1,
            calls: Cell::new(0),
        };
        let err = enrich_all(&input, &output, &config(), &service).unwrap_err();
        assert!(is_authorization(&err));
        assert_eq!(service.calls.get(), 2);

        let text = fs::read_to_string(output.join("run_report.json")).unwrap();
        let report: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(report.status, RunStatus::Aborted);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].doc, "وثيقة-a");
        assert!(report.documents.is_empty());
        assert_eq!(report.tokens.total, TokenUsage::new(4, 1));

        // second document was never analyzed
        let untouched = OutputPaths::new(output).document("وثيقة-b");
        assert!(!untouched.enrich_log_path().exists());
    }
}
