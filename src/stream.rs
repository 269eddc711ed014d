//! Streaming batch API: emit document reports as documents finish.
//!
//! Unlike [`crate::batch::split_directory`], which returns only after every
//! document is done, [`split_stream`] yields a [`DocumentReport`] as soon as
//! its worker completes. Reports arrive in completion order; sort by
//! `source` if order matters.
//!
//! The progress callback sees the same batch events as in the collecting
//! API: `on_batch_start` when the stream is built and `on_batch_complete`
//! once its last report has been yielded.

use crate::batch::spawn_worker;
use crate::config::SplitterConfig;
use crate::error::SplitError;
use crate::output::DocumentReport;
use crate::pipeline::input::discover_inputs;
use crate::processor::DocumentProcessor;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of document reports.
pub type ReportStream = Pin<Box<dyn Stream<Item = DocumentReport> + Send>>;

/// Discover the input documents of `config` and stream their reports.
///
/// Batch-level failures (missing input directory, pdfium or recognizer
/// unavailable) are returned before the stream is built. An empty input
/// directory yields an empty stream without touching either backend.
///
/// # Example
/// ```rust,no_run
/// use scan_splitter::{split_stream, SplitterConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SplitterConfig::builder().input_dir("scans").build()?;
/// let mut reports = split_stream(&config).await?;
/// while let Some(report) = reports.next().await {
///     match report.error {
///         None => println!("{}: done", report.source.display()),
///         Some(e) => eprintln!("{}: {e}", report.source.display()),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn split_stream(config: &SplitterConfig) -> Result<ReportStream, SplitError> {
    let inputs = discover_inputs(&config.input_dir, &config.input_extension).await?;
    if inputs.is_empty() {
        info!("No input documents found in '{}'", config.input_dir.display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_start(0);
            cb.on_batch_complete(0, 0);
        }
        return Ok(Box::pin(stream::empty()));
    }

    let processor = Arc::new(DocumentProcessor::from_config(config).await?);
    Ok(stream_documents(processor, inputs))
}

/// Stream reports for `inputs`, `concurrency` documents at a time.
///
/// `on_batch_complete` fires only if the stream is driven to its end.
pub fn stream_documents(processor: Arc<DocumentProcessor>, inputs: Vec<PathBuf>) -> ReportStream {
    let total = inputs.len();
    let concurrency = processor.config().concurrency.max(1);
    info!("Streaming {} document(s), {} at a time", total, concurrency);
    processor.planner().reserve_run_dirs(&inputs);
    let callback = processor.config().progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    let succeeded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&succeeded);
    let reports = stream::iter(inputs)
        .map(move |path| spawn_worker(Arc::clone(&processor), path))
        .buffer_unordered(concurrency)
        .inspect(move |report| {
            if report.is_success() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

    let finish = stream::once(async move {
        let succeeded = succeeded.load(Ordering::Relaxed);
        info!("Stream complete: {}/{} document(s) succeeded", succeeded, total);
        if let Some(cb) = callback {
            cb.on_batch_complete(total, succeeded);
        }
    })
    .filter_map(|()| async { None::<DocumentReport> });

    Box::pin(reports.chain(finish))
}
