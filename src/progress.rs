//! Progress-callback trait for batch, document and page events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitterConfigBuilder::progress_callback`] to follow a
//! run as it happens. The CLI uses this to drive its progress bar; library
//! callers can forward events to a channel, a log, or a UI.
//!
//! Documents are processed concurrently, so every event names the source
//! file it belongs to.
//!
//! # Example
//!
//! ```rust
//! use scan_splitter::{SplitProgressCallback, SplitterConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl SplitProgressCallback for PageCounter {
//!     fn on_page_complete(&self, _source: &Path, _page: usize, _total: usize, _len: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = SplitterConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::GroupOutcome;
use std::path::Path;
use std::sync::Arc;

/// Receives events from the splitting pipeline.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`:
/// events for different documents (and, with page concurrency above 1, for
/// different pages of one document) arrive from different tasks.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once with the number of input documents found.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after a document's page count is known.
    fn on_document_start(&self, source: &Path, total_pages: usize) {
        let _ = (source, total_pages);
    }

    /// Called before a page is rasterised.
    ///
    /// * `page_num`: 1-indexed page number
    fn on_page_start(&self, source: &Path, page_num: usize, total_pages: usize) {
        let _ = (source, page_num, total_pages);
    }

    /// Called when a page's text has been recognised.
    ///
    /// * `text_len`: byte length of the recognised text
    fn on_page_complete(&self, source: &Path, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (source, page_num, total_pages, text_len);
    }

    /// Called when a page could not be rasterised or recognised. The
    /// document is aborted right after.
    fn on_page_error(&self, source: &Path, page_num: usize, total_pages: usize, error: &str) {
        let _ = (source, page_num, total_pages, error);
    }

    /// Called once per planned output, after it was written, skipped or
    /// failed.
    fn on_output(&self, source: &Path, outcome: &GroupOutcome) {
        let _ = (source, outcome);
    }

    /// Called when a document is finished, successfully or not.
    fn on_document_complete(&self, source: &Path, success: bool) {
        let _ = (source, success);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::SplitterConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{GroupKind, OutputStatus};
    use crate::planner::WritePolicy;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tracker {
        pages: AtomicUsize,
        errors: AtomicUsize,
        outputs: Mutex<Vec<PathBuf>>,
        finished: Mutex<Vec<(PathBuf, bool)>>,
    }

    impl SplitProgressCallback for Tracker {
        fn on_page_complete(&self, _source: &Path, _page: usize, _total: usize, _len: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _source: &Path, _page: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_output(&self, _source: &Path, outcome: &GroupOutcome) {
            self.outputs.lock().unwrap().push(outcome.target.clone());
        }

        fn on_document_complete(&self, source: &Path, success: bool) {
            self.finished
                .lock()
                .unwrap()
                .push((source.to_path_buf(), success));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let src = Path::new("scan.pdf");
        cb.on_batch_start(2);
        cb.on_document_start(src, 3);
        cb.on_page_start(src, 1, 3);
        cb.on_page_complete(src, 1, 3, 42);
        cb.on_page_error(src, 2, 3, "tesseract crashed");
        cb.on_document_complete(src, false);
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracker_receives_events() {
        let tracker = Tracker::default();
        let src = Path::new("in/a.pdf");

        tracker.on_page_complete(src, 1, 2, 10);
        tracker.on_page_complete(src, 2, 2, 0);
        tracker.on_page_error(Path::new("in/b.pdf"), 1, 1, "boom");
        tracker.on_output(
            src,
            &GroupOutcome {
                kind: GroupKind::Run,
                label: "run #1 (pages 1-2)".into(),
                pages: vec![1, 2],
                target: PathBuf::from("splits/a/CoA_1.pdf"),
                policy: WritePolicy::Overwrite,
                status: OutputStatus::Written,
            },
        );
        tracker.on_document_complete(src, true);

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.outputs.lock().unwrap(),
            vec![PathBuf::from("splits/a/CoA_1.pdf")]
        );
        assert_eq!(
            *tracker.finished.lock().unwrap(),
            vec![(PathBuf::from("in/a.pdf"), true)]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start(Path::new("x.pdf"), 4);
    }
}
