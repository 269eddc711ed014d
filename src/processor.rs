//! One document, end to end.
//!
//! ```text
//! validate ─▶ page count ─▶ rasterise + recognise every page ─▶ classify/key
//!          ─▶ assign groups ─▶ plan outputs ─▶ materialise each proceeding entry
//! ```
//!
//! A page that cannot be rasterised or recognised aborts its document
//! before anything is planned, so an aborted document leaves no output
//! behind. Once planning starts, failures are per output: a group that
//! cannot be written is reported as failed and its siblings are still
//! written.
//!
//! ## Materialisation
//!
//! Each output is extracted into a hidden staging file in the target's
//! directory and then renamed onto the target. A reader never sees a
//! half-written PDF. Skip-if-exists targets are persisted with a no-clobber
//! rename, which closes the gap between the planner's existence check and
//! the write when two documents of a batch produce the same quotation.

use crate::config::SplitterConfig;
use crate::document::Document;
use crate::error::{GroupError, SplitError};
use crate::grouping::{assign, Group};
use crate::output::{DocumentReport, DocumentStats, GroupKind, GroupOutcome, OutputStatus, SplitOutcome};
use crate::pipeline::extract::PageExtractor;
use crate::pipeline::input::validate_pdf;
use crate::pipeline::recognize::{recognizer_from_config, TextRecognizer};
use crate::pipeline::render::{PdfiumBackend, Rasterizer};
use crate::planner::{Decision, OutputPlanner, PlanEntry, WritePolicy};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Processes single documents with a fixed set of collaborators.
///
/// Holds no per-document state, so one processor serves every worker of a
/// batch.
pub struct DocumentProcessor {
    config: SplitterConfig,
    planner: OutputPlanner,
    rasterizer: Arc<dyn Rasterizer>,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: Arc<dyn PageExtractor>,
}

impl DocumentProcessor {
    /// Processor with explicit collaborators.
    pub fn new(
        config: SplitterConfig,
        rasterizer: Arc<dyn Rasterizer>,
        recognizer: Arc<dyn TextRecognizer>,
        extractor: Arc<dyn PageExtractor>,
    ) -> Self {
        Self {
            planner: OutputPlanner::from_config(&config),
            config,
            rasterizer,
            recognizer,
            extractor,
        }
    }

    /// Processor backed by pdfium and the recognizer selected in `config`.
    ///
    /// Binds pdfium and checks the recognizer, so a broken installation is
    /// reported once instead of once per document.
    pub async fn from_config(config: &SplitterConfig) -> Result<Self, SplitError> {
        let backend = Arc::new(PdfiumBackend::from_config(config));
        backend.ensure_bound()?;
        let recognizer = recognizer_from_config(config).await?;
        Ok(Self::new(
            config.clone(),
            backend.clone(),
            recognizer,
            backend,
        ))
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn planner(&self) -> &OutputPlanner {
        &self.planner
    }

    /// Process `source` and fold the result into a report.
    ///
    /// Never fails: an aborted document becomes a report carrying the reason.
    pub async fn process_report(&self, source: &Path) -> DocumentReport {
        let result = self.process(source).await;
        let success = result.is_ok();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_complete(source, success);
        }
        match result {
            Ok(outcome) => DocumentReport::succeeded(source.to_path_buf(), outcome),
            Err(e) => {
                error!("Aborted '{}': {}", source.display(), e);
                DocumentReport::failed(source.to_path_buf(), e)
            }
        }
    }

    /// Process one document: recognise, group, plan, and materialise.
    pub async fn process(&self, source: &Path) -> Result<SplitOutcome, SplitError> {
        let total_start = Instant::now();
        info!("Processing '{}'", source.display());

        // ── Step 1: Recognise every page ─────────────────────────────────
        let recognition_start = Instant::now();
        let document = self.recognize_document(source).await?;
        let recognition_duration_ms = recognition_start.elapsed().as_millis() as u64;

        // ── Step 2: Group ────────────────────────────────────────────────
        let assignment = assign(&document);
        info!(
            "'{}': {} pages, {} run group(s), {} keyed group(s)",
            source.display(),
            document.page_count(),
            assignment.runs.len(),
            assignment.keyed.len()
        );

        // ── Step 3: Plan ─────────────────────────────────────────────────
        let plan = self.planner.plan(source, &assignment).await;

        // ── Step 4: Materialise ──────────────────────────────────────────
        let extraction_start = Instant::now();
        let mut outputs = Vec::with_capacity(plan.len());
        for entry in &plan.entries {
            let status = match entry.decision {
                Decision::Skip(ref reason) => OutputStatus::Skipped {
                    reason: reason.to_string(),
                },
                Decision::Proceed if self.config.dry_run => OutputStatus::Planned,
                Decision::Proceed => self.materialise(source, entry).await,
            };
            let outcome = outcome_for(entry, status);
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_output(source, &outcome);
            }
            outputs.push(outcome);
        }
        let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

        let stats = DocumentStats {
            page_count: document.page_count(),
            run_groups: assignment.runs.len(),
            keyed_groups: assignment.keyed.len(),
            written: outputs.iter().filter(|o| o.status.is_written()).count(),
            skipped: outputs.iter().filter(|o| o.status.is_skipped()).count(),
            failed: outputs.iter().filter(|o| o.status.is_failed()).count(),
            recognition_duration_ms,
            extraction_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Finished '{}': {} written, {} skipped, {} failed, {}ms",
            source.display(),
            stats.written,
            stats.skipped,
            stats.failed,
            stats.total_duration_ms
        );

        Ok(SplitOutcome {
            source: source.to_path_buf(),
            pages: document.page_records(),
            outputs,
            stats,
        })
    }

    /// Validate `source`, then rasterise and recognise all of its pages.
    ///
    /// Pages are recognised up to `page_concurrency` at a time; the result
    /// keeps source order. The first failing page aborts the rest.
    pub async fn recognize_document(&self, source: &Path) -> Result<Document, SplitError> {
        validate_pdf(source)?;

        let total_pages = self.rasterizer.page_count(source).await?;
        debug!("'{}' has {} pages", source.display(), total_pages);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(source, total_pages);
        }

        let texts: Vec<String> = stream::iter(1..=total_pages)
            .map(|page_num| self.recognize_page(source, page_num, total_pages))
            .buffered(self.config.page_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(Document::from_texts(source, texts))
    }

    async fn recognize_page(
        &self,
        source: &Path,
        page_num: usize,
        total_pages: usize,
    ) -> Result<String, SplitError> {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_page_start(source, page_num, total_pages);
        }

        let result = match self.rasterizer.rasterize(source, page_num).await {
            Ok(image) => self.recognizer.recognize(page_num, &image).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                debug!(
                    "'{}' page {}/{}: {} bytes of text",
                    source.display(),
                    page_num,
                    total_pages,
                    text.len()
                );
                if let Some(cb) = cb {
                    cb.on_page_complete(source, page_num, total_pages, text.len());
                }
                Ok(text)
            }
            Err(e) => {
                warn!(
                    "'{}' page {}/{}: {}",
                    source.display(),
                    page_num,
                    total_pages,
                    e
                );
                if let Some(cb) = cb {
                    cb.on_page_error(source, page_num, total_pages, &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Write one proceeding plan entry.
    async fn materialise(&self, source: &Path, entry: &PlanEntry) -> OutputStatus {
        match self.write_output(source, entry).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Failed to write {} of '{}': {}",
                    entry.group.label(),
                    source.display(),
                    e
                );
                OutputStatus::Failed { error: e }
            }
        }
    }

    async fn write_output(&self, source: &Path, entry: &PlanEntry) -> Result<OutputStatus, GroupError> {
        let target = &entry.target;
        self.planner.prepare(target).await?;

        let dir = target.dir();
        let staged = tempfile::Builder::new()
            .prefix(".scansplit-")
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(|e| GroupError::StagingFailed {
                dir: dir.to_path_buf(),
                detail: e.to_string(),
            })?
            .into_temp_path();

        self.extractor
            .extract(source, &entry.group.page_numbers(), &staged)
            .await?;

        let persisted = match target.policy {
            WritePolicy::Overwrite => staged.persist(&target.path),
            WritePolicy::SkipIfExists => staged.persist_noclobber(&target.path),
        };

        match persisted {
            Ok(()) => {
                info!(
                    "Wrote {} of '{}' to '{}'",
                    entry.group.label(),
                    source.display(),
                    target.path.display()
                );
                Ok(OutputStatus::Written)
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                info!(
                    "Skipping {} of '{}': '{}' was created by another worker",
                    entry.group.label(),
                    source.display(),
                    target.path.display()
                );
                Ok(OutputStatus::Skipped {
                    reason: "created by another worker while writing".into(),
                })
            }
            Err(e) => Err(GroupError::PersistFailed {
                path: target.path.clone(),
                detail: e.error.to_string(),
            }),
        }
    }
}

fn outcome_for(entry: &PlanEntry, status: OutputStatus) -> GroupOutcome {
    GroupOutcome {
        kind: match entry.group {
            Group::Run(_) => GroupKind::Run,
            Group::Keyed(_) => GroupKind::Keyed,
        },
        label: entry.group.label(),
        pages: entry.group.page_numbers(),
        target: entry.target.path.clone(),
        policy: entry.target.policy,
        status,
    }
}
