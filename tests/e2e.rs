//! End-to-end tests against real pdfium and a real tesseract install.
//!
//! Fixture scans are generated with pdfium at test time: each page carries a
//! few lines of large Helvetica text, which tesseract reads reliably at
//! 300 DPI. The tests are gated behind `E2E_ENABLED` so they do not run in
//! CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_DYNAMIC_LIB_PATH=. cargo test --test e2e -- --nocapture

use pdfium_render::prelude::*;
use scan_splitter::pipeline::render::{inspect, pdfium, PdfiumBackend};
use scan_splitter::{
    inspect_directory, split_directory, OutputStatus, PageCategory, SplitterConfig,
    SplitterConfigBuilder,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn library_dir() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH").map(PathBuf::from)
}

/// Write a PDF with one page per entry of `pages`, each line of text drawn
/// top-down on an A4 page.
fn write_scan(path: &Path, pages: &[&[&str]]) {
    let pdfium = pdfium(library_dir().as_deref()).expect("pdfium binding");
    let mut document = pdfium.create_new_pdf().expect("new pdf");
    let font = document.fonts_mut().helvetica();

    for lines in pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .expect("new page");
        for (i, line) in lines.iter().enumerate() {
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(60.0),
                    PdfPoints::new(760.0 - 40.0 * i as f32),
                    *line,
                    font,
                    PdfPoints::new(20.0),
                )
                .expect("text object");
        }
    }

    document.save_to_file(path).expect("save fixture");
}

fn config(root: &Path) -> SplitterConfigBuilder {
    let mut builder = SplitterConfig::builder()
        .input_dir(root.join("scans"))
        .run_root(root.join("splits"))
        .keyed_root(root.join("pilots"))
        .tesseract_lang("eng");
    if let Some(dir) = library_dir() {
        builder = builder.pdfium_library_dir(dir);
    }
    builder
}

fn fixture_batch(root: &Path) -> PathBuf {
    let scans = root.join("scans");
    std::fs::create_dir_all(&scans).unwrap();
    let path = scans.join("batch.pdf");
    write_scan(
        &path,
        &[
            &["Delivery note", "Thank you for your order"],
            &["ACME Laboratories", "Certificate of Analysis", "Lot 4711"],
            &["Assay results", "All values within limits"],
            &["PILOT BATCH REPORT", "Quotation No. : QB1234", "Version : 2"],
        ],
    );
    path
}

async fn page_count(path: &Path) -> usize {
    let mut backend = PdfiumBackend::new(300, 5000);
    if let Some(dir) = library_dir() {
        backend = backend.with_library_dir(dir);
    }
    inspect(path, &backend).await.expect("inspect").page_count
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn e2e_inspect_fixture() {
    e2e_skip_unless_enabled!();
    let tmp = TempDir::new().unwrap();
    fixture_batch(tmp.path());

    let infos = inspect_directory(&config(tmp.path()).build().unwrap())
        .await
        .expect("inspect directory");

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].page_count, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_split_batch() {
    e2e_skip_unless_enabled!();
    let tmp = TempDir::new().unwrap();
    fixture_batch(tmp.path());

    let summary = split_directory(&config(tmp.path()).build().unwrap())
        .await
        .expect("split");

    assert_eq!(summary.stats.succeeded, 1, "{:#?}", summary.documents);
    let outcome = summary.documents[0].outcome.as_ref().unwrap();
    let categories: Vec<_> = outcome.pages.iter().map(|p| p.category).collect();
    println!("categories: {categories:?}");
    assert_eq!(categories[1], PageCategory::RunMarker);
    assert_eq!(categories[3], PageCategory::KeyedCandidate);

    let run = tmp.path().join("splits/batch/CoA_1.pdf");
    let keyed = tmp.path().join("pilots/QB-QB1234/PilotReport_V2.pdf");
    assert!(run.exists(), "missing {}", run.display());
    assert!(keyed.exists(), "missing {}", keyed.display());
    assert_eq!(page_count(&run).await, 3);
    assert_eq!(page_count(&keyed).await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_rerun_keeps_keyed_output() {
    e2e_skip_unless_enabled!();
    let tmp = TempDir::new().unwrap();
    fixture_batch(tmp.path());
    let config = config(tmp.path()).build().unwrap();

    split_directory(&config).await.expect("first run");
    let summary = split_directory(&config).await.expect("second run");

    let outcome = summary.documents[0].outcome.as_ref().unwrap();
    let statuses: Vec<_> = outcome.outputs.iter().map(|o| &o.status).collect();
    println!("second run: {statuses:?}");
    assert_eq!(statuses[0], &OutputStatus::Written);
    assert!(statuses[1].is_skipped());
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_dry_run_writes_nothing() {
    e2e_skip_unless_enabled!();
    let tmp = TempDir::new().unwrap();
    fixture_batch(tmp.path());

    let summary = split_directory(&config(tmp.path()).dry_run(true).build().unwrap())
        .await
        .expect("dry run");

    assert_eq!(summary.stats.outputs_planned, 2);
    assert!(!tmp.path().join("splits").exists());
    assert!(!tmp.path().join("pilots").exists());
}
