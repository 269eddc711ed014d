//! # scan-splitter
//!
//! Split batches of scanned PDFs into smaller documents using OCR.
//!
//! A scanner batch mixes two kinds of paperwork: certificates (each starting
//! on a page headed "Certificate of Analysis" or "Specification Sheet" and
//! running until the next such page) and pilot reports (pages mentioning
//! "PILOT" and carrying a quotation number). This crate reads every page,
//! finds both kinds of group, and writes each group to its own PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! scans/*.pdf
//!  │
//!  ├─ 1. Discover  list input documents (non-recursive)
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Recognise tesseract subprocess, or a vision model
//!  ├─ 4. Classify  run marker / keyed candidate / unclassified
//!  ├─ 5. Group     consecutive runs + pages sharing a quotation key
//!  ├─ 6. Plan      target paths, write policies, skip decisions
//!  └─ 7. Extract   copy page sets into new PDFs
//! ```
//!
//! Outputs land in two trees:
//!
//! ```text
//! splits/<document>/CoA_<n>.pdf            overwritten on every run
//! pilots/QB-<id>/PilotReport_V<v>.pdf      written once, never replaced
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan_splitter::{split_directory, SplitterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitterConfig::builder().input_dir("scans").build()?;
//!     let summary = split_directory(&config).await?;
//!     eprintln!(
//!         "{} written, {} skipped, {} failed",
//!         summary.stats.outputs_written,
//!         summary.stats.outputs_skipped,
//!         summary.stats.outputs_failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scansplit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! scan-splitter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod grouping;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{inspect_directory, split_directory, split_directory_sync, split_documents, split_file};
pub use classify::{classify, PageCategory};
pub use config::{RecognizerKind, SplitterConfig, SplitterConfigBuilder};
pub use document::{Document, Page};
pub use error::{GroupError, SplitError};
pub use fields::{extract_key, GroupKey};
pub use grouping::{assign, Group, GroupAssignment, KeyedGroup, RunGroup};
pub use output::{
    BatchStats, BatchSummary, DocumentReport, DocumentStats, GroupKind, GroupOutcome,
    OutputStatus, PageRecord, SplitOutcome,
};
pub use pipeline::extract::PageExtractor;
pub use pipeline::recognize::{TesseractRecognizer, TextRecognizer, VisionRecognizer};
pub use pipeline::render::{PdfInfo, PdfiumBackend, Rasterizer};
pub use planner::{OutputLayout, OutputPlanner, Plan, WritePolicy};
pub use processor::DocumentProcessor;
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use stream::{split_stream, ReportStream};
