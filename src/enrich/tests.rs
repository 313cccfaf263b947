use super::*;
use crate::analysis::{AnalysisError, AnalysisOutcome, CorrectionRecord};
use crate::model::{Aspect, AtomicUnit, UnitMeta};
use crate::review::ReviewReport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Service driven by a closure over the unit text and the call index.
struct MockService<F> {
    respond: F,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl<F> MockService<F>
where
    F: Fn(&str, usize) -> Result<AnalysisOutcome, AnalysisError>,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> AnalysisService for MockService<F>
where
    F: Fn(&str, usize) -> Result<AnalysisOutcome, AnalysisError>,
{
    fn analyze(&self, request: &AnalysisRequest<'_>) -> Result<AnalysisOutcome, AnalysisError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.text.to_string());
        (self.respond)(request.text, call)
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
    }
}

fn write_units(paths: &DocPaths, numbers: &[&str]) {
    for number in numbers {
        let mut meta = UnitMeta::new(
            crate::slug::unit_id(paths.slug(), number),
            paths.slug().to_string(),
            number.to_string(),
        );
        meta.summary = Some("X".into());
        let unit = AtomicUnit {
            meta,
            body: format!("# المادة {number}\nنص {number} {{#art-{number}}}"),
        };
        store::save_unit(&paths.unit_path(unit.id()), &unit).unwrap();
    }
}

fn doc(dir: &tempfile::TempDir) -> DocPaths {
    DocPaths::new(dir.path().to_path_buf(), "d".into())
}

fn load(paths: &DocPaths, number: &str) -> AtomicUnit {
    store::load_unit(&paths.unit_path(&crate::slug::unit_id(paths.slug(), number))).unwrap()
}

fn success(corrections: Vec<CorrectionRecord>) -> Result<AnalysisOutcome, AnalysisError> {
    Ok(AnalysisOutcome {
        response: AnalysisResponse {
            keywords: Some(vec!["أجر".into()]),
            aspect: Some("إجرائي".into()),
            ocr_corrections: corrections,
            ..Default::default()
        },
        usage: TokenUsage::new(10, 3),
    })
}

fn correction(word: &str) -> CorrectionRecord {
    CorrectionRecord {
        original_word: word.into(),
        suggested_correction: format!("{word}ـ"),
        context: String::new(),
    }
}

#[test]
fn units_are_processed_in_article_order_with_links() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    write_units(&paths, &["3", "1", "2"]);
    let service = MockService::new(|_, _| success(Vec::new()));
    let mut ledger = DocumentLedger::new("d");

    let outcome = enrich_document(
        &paths,
        &DocumentContext::Available("سياق".into()),
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap();

    assert_eq!(outcome.enriched, 3);
    let seen = service.seen.lock().unwrap().clone();
    assert!(seen[0].contains("نص 1") && seen[1].contains("نص 2") && seen[2].contains("نص 3"));

    let first = load(&paths, "1");
    let middle = load(&paths, "2");
    let last = load(&paths, "3");
    assert_eq!(first.meta.prev, None);
    assert_eq!(first.meta.next.as_deref(), Some("d--مادة-002"));
    assert_eq!(middle.meta.prev.as_deref(), Some("d--مادة-001"));
    assert_eq!(middle.meta.next.as_deref(), Some("d--مادة-003"));
    assert_eq!(last.meta.next, None);

    // summary absent from the response: the existing value stays
    assert_eq!(middle.meta.summary.as_deref(), Some("X"));
    assert_eq!(middle.meta.aspect, Some(Aspect::Procedural));
    assert_eq!(ledger.total, TokenUsage::new(30, 9));
}

#[test]
fn always_malformed_service_degrades_every_unit() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    write_units(&paths, &["1", "2"]);
    let mut unit = load(&paths, "1");
    unit.meta.ocr_corrections = Some([("قديم".to_string(), "جديد".to_string())].into());
    store::save_unit(&paths.unit_path(unit.id()), &unit).unwrap();

    let service = MockService::new(|_, _| Err(AnalysisError::Malformed("not json".into())));
    let mut ledger = DocumentLedger::new("d");
    let outcome = enrich_document(
        &paths,
        &DocumentContext::NoContext,
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap();

    assert_eq!(service.calls(), 6);
    assert_eq!(outcome.degraded, 2);
    assert_eq!(outcome.enriched, 0);
    assert!(!outcome.context_available);

    let first = load(&paths, "1");
    assert_eq!(first.meta.ocr_corrections, Some(Default::default()));
    assert_eq!(first.meta.next.as_deref(), Some("d--مادة-002"));
    assert_eq!(first.meta.summary.as_deref(), Some("X"));
    assert_eq!(first.meta.keywords, Some(Vec::new()));
    assert_eq!(ledger.total, TokenUsage::default());
    assert!(!paths.review_path().exists());

    let log = log::load_enrich_log(&paths).unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.attempts == 3));
}

#[test]
fn transient_failure_then_success_counts_only_the_successful_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    write_units(&paths, &["1"]);
    let service = MockService::new(|_, call| {
        if call == 0 {
            Err(AnalysisError::Transient("503".into()))
        } else {
            success(Vec::new())
        }
    });
    let mut ledger = DocumentLedger::new("d");
    let outcome = enrich_document(
        &paths,
        &DocumentContext::NoContext,
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap();
    assert_eq!(outcome.enriched, 1);
    assert_eq!(service.calls(), 2);
    assert_eq!(ledger.total, TokenUsage::new(10, 3));
}

#[test]
fn authorization_failure_stops_after_links_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    write_units(&paths, &["1", "2", "3"]);
    let service = MockService::new(|_, call| {
        if call == 0 {
            success(Vec::new())
        } else {
            Err(AnalysisError::Authorization("403".into()))
        }
    });
    let mut ledger = DocumentLedger::new("d");
    let err = enrich_document(
        &paths,
        &DocumentContext::NoContext,
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::Authorization(_))
    ));
    assert_eq!(service.calls(), 2);
    // the third unit was never analyzed but still carries its links
    let last = load(&paths, "3");
    assert_eq!(last.meta.prev.as_deref(), Some("d--مادة-002"));
    assert_eq!(last.meta.keywords, None);
    assert_eq!(load(&paths, "1").meta.keywords, Some(vec!["أجر".to_string()]));
}

#[test]
fn corrections_feed_the_review_report() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    write_units(&paths, &["1", "2", "3"]);
    let service = MockService::new(|text, _| {
        if text.contains("نص 1") {
            success(vec![correction("ا"), correction("ب")])
        } else if text.contains("نص 3") {
            success(vec![correction("ج")])
        } else {
            success(Vec::new())
        }
    });
    let mut ledger = DocumentLedger::new("d");
    let outcome = enrich_document(
        &paths,
        &DocumentContext::NoContext,
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap();

    assert_eq!(outcome.corrections, 3);
    let report: ReviewReport =
        serde_json::from_str(&std::fs::read_to_string(paths.review_path()).unwrap()).unwrap();
    assert_eq!(report.total_corrections, 3);
    assert_eq!(report.affected_unit_count, 2);
    assert_eq!(report.records[2].source_unit_id, "d--مادة-003");
    assert_eq!(report.records[2].article_number, "3");

    let first = load(&paths, "1");
    assert_eq!(first.meta.ocr_corrections.unwrap().len(), 2);
    assert_eq!(load(&paths, "2").meta.summary.as_deref(), Some("X"));
}

#[test]
fn empty_folder_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let paths = doc(&dir);
    let service = MockService::new(|_, _| success(Vec::new()));
    let mut ledger = DocumentLedger::new("d");
    let outcome = enrich_document(
        &paths,
        &DocumentContext::NoContext,
        &service,
        &policy(),
        &mut ledger,
    )
    .unwrap();
    assert_eq!(outcome.units, 0);
    assert_eq!(service.calls(), 0);
}
