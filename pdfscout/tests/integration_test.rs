mod common;

use anyhow::Result;
use common::{write_pdf, CountingBackend, FixedOcr};
use pdfscout::{
    FileErrorKind, FileOutcome, PdfBackend, SearchConfig, SearchError, SearchEvent, SearchSession,
};
use std::fs;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_native_text_is_found_in_real_pdf() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(
        &dir.path().join("invoice.pdf"),
        &["Invoice 1001", "Order 123 received"],
    )?;

    let report = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?.run(|_| {})?;

    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_errored, 0);
    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.total_matches, 1);
    let hit = &report.matches[0];
    assert_eq!(hit.page, 2);
    assert_eq!(hit.matched, "Order");
    assert!(hit.snippet.contains("Order 123 received"));
    assert!(!hit.used_ocr);
    Ok(())
}

#[test]
fn test_native_and_scanned_documents() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("a.pdf"), &["Order 123 received"])?;
    write_pdf(&dir.path().join("b.pdf"), &[""])?;
    let ocr = FixedOcr::new("Order 999");

    let config = SearchConfig::new(dir.path(), "Order").with_ocr(true);
    let report = SearchSession::new(config)?
        .with_ocr(ocr.source())
        .run(|_| {})?;

    assert_eq!(report.total_matches, 2);
    assert_eq!(report.files_errored, 0);
    assert!(report.matches[0].path.ends_with("a.pdf"));
    assert!(report.matches[1].path.ends_with("b.pdf"));
    assert!(report.matches[1].used_ocr);
    assert_eq!(report.ocr_pages, 1);
    // The native page never reaches OCR
    assert_eq!(ocr.calls(), 1);
    Ok(())
}

#[test]
fn test_scanned_page_without_ocr_contributes_nothing() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("a.pdf"), &["Order 123 received"])?;
    write_pdf(&dir.path().join("b.pdf"), &[""])?;
    let ocr = FixedOcr::new("Order 999");

    let report = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?
        .with_ocr(ocr.source())
        .run(|_| {})?;

    assert_eq!(report.total_matches, 1);
    assert_eq!(report.files_errored, 0);
    assert_eq!(ocr.calls(), 0);
    Ok(())
}

#[test]
fn test_case_sensitivity() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(
        &dir.path().join("mixed.pdf"),
        &["invoice INVOICE InVoIcE Invoice"],
    )?;

    let exact = SearchSession::new(SearchConfig::new(dir.path(), "Invoice"))?.run(|_| {})?;
    assert_eq!(exact.total_matches, 1);

    let config = SearchConfig::new(dir.path(), "Invoice").with_ignore_case(true);
    let folded = SearchSession::new(config)?.run(|_| {})?;
    assert_eq!(folded.total_matches, 4);
    let matched: Vec<_> = folded.matches.iter().map(|m| m.matched.as_str()).collect();
    assert_eq!(matched, vec!["invoice", "INVOICE", "InVoIcE", "Invoice"]);
    Ok(())
}

#[test]
fn test_regex_search() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("orders.pdf"), &["order 12 and ORDER 345, order x"])?;

    let config = SearchConfig::new(dir.path(), r"order\s+\d+")
        .with_regex(true)
        .with_ignore_case(true);
    let report = SearchSession::new(config)?.run(|_| {})?;

    let matched: Vec<_> = report.matches.iter().map(|m| m.matched.as_str()).collect();
    assert_eq!(matched, vec!["order 12", "ORDER 345"]);
    Ok(())
}

#[test]
fn test_invalid_regex_opens_no_files() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("a.pdf"), &["Order 1"])?;

    let config = SearchConfig::new(dir.path(), "Order[").with_regex(true);
    let result = SearchSession::new(config);
    assert!(matches!(result, Err(SearchError::InvalidPattern(_))));
    Ok(())
}

#[test]
fn test_corrupt_file_among_valid_files() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..4 {
        write_pdf(&dir.path().join(format!("good{i}.pdf")), &["Order 7"])?;
    }
    fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4 this is not a pdf")?;

    let report = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?.run(|_| {})?;

    assert_eq!(report.files_total, 5);
    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.files_errored, 1);
    assert_eq!(report.total_matches, 4);
    assert_eq!(report.errors[0].kind, FileErrorKind::Corrupt);
    assert!(report.errors[0].path.ends_with("broken.pdf"));
    assert!(report.to_string().contains("1 files failed"));
    Ok(())
}

#[test]
fn test_recursive_flag() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("2023").join("q4"))?;
    write_pdf(&dir.path().join("top.pdf"), &["Order 1"])?;
    write_pdf(&dir.path().join("2023").join("q4").join("deep.pdf"), &["Order 2"])?;
    fs::write(dir.path().join("notes.txt"), "Order 3")?;

    let deep = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?.run(|_| {})?;
    assert_eq!(deep.files_total, 2);
    assert_eq!(deep.total_matches, 2);
    // "2023/..." sorts before "top.pdf"
    assert!(deep.matches[0].path.ends_with("deep.pdf"));

    let config = SearchConfig::new(dir.path(), "Order").with_recursive(false);
    let flat = SearchSession::new(config)?.run(|_| {})?;
    assert_eq!(flat.files_total, 1);
    assert_eq!(flat.total_matches, 1);
    Ok(())
}

#[test]
fn test_repeated_runs_are_identical() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..10 {
        let text = format!("Order {i} shipped, Order {} pending", i * 10);
        write_pdf(&dir.path().join(format!("f{i}.pdf")), &[text.as_str(), "Order last"])?;
    }
    let config = SearchConfig::new(dir.path(), "Order")
        .with_thread_count(NonZeroUsize::new(4).unwrap());

    let first = SearchSession::new(config.clone())?.run(|_| {})?;
    let second = SearchSession::new(config)?.run(|_| {})?;

    assert_eq!(first.total_matches, 30);
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.files_scanned, second.files_scanned);
    assert_eq!(first.pages_scanned, second.pages_scanned);
    Ok(())
}

#[test]
fn test_cancellation_stops_dispatch() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..30 {
        write_pdf(&dir.path().join(format!("f{i:02}.pdf")), &["Order"])?;
    }
    let backend = CountingBackend::slow(Duration::from_millis(20));
    let config = SearchConfig::new(dir.path(), "Order")
        .with_thread_count(NonZeroUsize::new(2).unwrap());
    let session = SearchSession::new(config)?.with_backend(backend.clone() as Arc<dyn PdfBackend>);
    let cancel = session.cancel_token();

    let report = session.run(|progress| {
        if progress.files_done == 2 {
            cancel.cancel();
        }
    })?;

    assert!(report.cancelled);
    assert!(report.files_scanned >= 2);
    assert!(report.files_scanned < 30);
    // Every file that was opened finished and was reported
    assert_eq!(report.files_scanned, backend.opens());
    assert!(report.to_string().contains("cancelled after"));
    Ok(())
}

#[test]
fn test_spawned_search_events() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("a.pdf"), &["Order 1"])?;
    write_pdf(&dir.path().join("b.pdf"), &["nothing here"])?;
    write_pdf(&dir.path().join("c.pdf"), &["Order 2 Order 3"])?;

    let handle = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?.spawn()?;
    let mut done = Vec::new();
    let mut report = None;
    for event in handle {
        match event {
            SearchEvent::Progress(p) => {
                assert_eq!(p.files_total, 3);
                done.push(p.files_done);
            }
            SearchEvent::Finished(r) => report = Some(r),
        }
    }

    assert_eq!(done, vec![1, 2, 3]);
    let report = report.expect("finished event");
    assert_eq!(report.total_matches, 3);
    assert_eq!(report.files_with_matches(), 2);
    Ok(())
}

#[test]
fn test_report_serializes_to_json() -> Result<()> {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("a.pdf"), &["Order 1"])?;
    fs::write(dir.path().join("z.pdf"), b"garbage")?;

    let report = SearchSession::new(SearchConfig::new(dir.path(), "Order"))?.run(|_| {})?;
    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;

    assert_eq!(json["total_matches"], 1);
    assert_eq!(json["matches"][0]["page"], 1);
    assert_eq!(json["errors"][0]["kind"], "corrupt");
    Ok(())
}

#[test]
fn test_file_outcome_tagging() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.pdf");
    write_pdf(&path, &["Order 1"])?;

    let outcome = FileOutcome::Failed(pdfscout::FileError::encrypted(&path));
    let json = serde_json::to_value(&outcome)?;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["kind"], "encrypted");
    Ok(())
}
