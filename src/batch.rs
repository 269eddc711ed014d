//! Batch entry points: process every scan in the input directory.
//!
//! One worker per document, at most `concurrency` at a time. Workers share
//! nothing but the processor (which is stateless per document) and the
//! output filesystem. Each worker runs in its own Tokio task, so a panic in
//! one document turns into a failed report instead of taking the batch down.
//!
//! Use [`crate::stream::split_stream`] instead when reports should be
//! consumed as documents finish.

use crate::config::SplitterConfig;
use crate::error::SplitError;
use crate::output::{BatchSummary, DocumentReport, SplitOutcome};
use crate::pipeline::input::discover_inputs;
use crate::pipeline::render::{inspect, PdfInfo, PdfiumBackend};
use crate::processor::DocumentProcessor;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Process every input document found in `config.input_dir`.
///
/// # Errors
/// Only batch-level failures are returned: the input directory is missing
/// or unreadable, pdfium cannot be bound, or the recognizer is unavailable.
/// Per-document failures are recorded in the returned summary.
pub async fn split_directory(config: &SplitterConfig) -> Result<BatchSummary, SplitError> {
    let start = Instant::now();
    let inputs = discover_inputs(&config.input_dir, &config.input_extension).await?;
    if inputs.is_empty() {
        info!("No input documents found in '{}'", config.input_dir.display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(0);
            cb.on_batch_complete(0, 0);
        }
        return Ok(BatchSummary::from_reports(
            Vec::new(),
            start.elapsed().as_millis() as u64,
        ));
    }

    let processor = Arc::new(DocumentProcessor::from_config(config).await?);
    Ok(split_documents(processor, inputs).await)
}

/// Process `inputs` with `processor`, `concurrency` documents at a time.
///
/// Reports are sorted by source path in the returned summary.
pub async fn split_documents(
    processor: Arc<DocumentProcessor>,
    inputs: Vec<PathBuf>,
) -> BatchSummary {
    let start = Instant::now();
    let total = inputs.len();
    let concurrency = processor.config().concurrency.max(1);
    info!(
        "Splitting {} document(s), {} at a time",
        total, concurrency
    );
    processor.planner().reserve_run_dirs(&inputs);
    if let Some(ref cb) = processor.config().progress_callback {
        cb.on_batch_start(total);
    }

    let reports: Vec<DocumentReport> = stream::iter(inputs)
        .map(|path| spawn_worker(Arc::clone(&processor), path))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let summary = BatchSummary::from_reports(reports, start.elapsed().as_millis() as u64);
    info!(
        "Batch complete: {}/{} document(s) succeeded, {} output(s) written, {} skipped, {} failed",
        summary.stats.succeeded,
        summary.stats.total_documents,
        summary.stats.outputs_written,
        summary.stats.outputs_skipped,
        summary.stats.outputs_failed
    );
    if let Some(ref cb) = processor.config().progress_callback {
        cb.on_batch_complete(total, summary.stats.succeeded);
    }
    summary
}

/// Run one document in its own task.
pub(crate) async fn spawn_worker(processor: Arc<DocumentProcessor>, path: PathBuf) -> DocumentReport {
    let source = path.clone();
    match tokio::spawn(async move { processor.process_report(&path).await }).await {
        Ok(report) => report,
        Err(e) => DocumentReport::failed(source, format!("worker task failed: {e}")),
    }
}

/// Process a single document with the collaborators selected in `config`.
pub async fn split_file(
    path: impl AsRef<Path>,
    config: &SplitterConfig,
) -> Result<SplitOutcome, SplitError> {
    let processor = DocumentProcessor::from_config(config).await?;
    processor.process(path.as_ref()).await
}

/// Synchronous wrapper around [`split_directory`].
///
/// Creates a temporary tokio runtime internally.
pub fn split_directory_sync(config: &SplitterConfig) -> Result<BatchSummary, SplitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SplitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(split_directory(config))
}

/// Page count and metadata of every input document, without recognising
/// anything.
///
/// Unreadable documents are logged and left out.
pub async fn inspect_directory(config: &SplitterConfig) -> Result<Vec<PdfInfo>, SplitError> {
    let inputs = discover_inputs(&config.input_dir, &config.input_extension).await?;
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let backend = PdfiumBackend::from_config(config);
    backend.ensure_bound()?;

    let mut infos = Vec::with_capacity(inputs.len());
    for path in inputs {
        match inspect(&path, &backend).await {
            Ok(info) => infos.push(info),
            Err(e) => warn!("Cannot inspect '{}': {}", path.display(), e),
        }
    }
    Ok(infos)
}
