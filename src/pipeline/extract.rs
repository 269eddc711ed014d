//! Page-set extraction: write selected pages of a scan to a new PDF.
//!
//! Pages are copied, not re-rendered, so the output keeps the scanner's
//! original image streams and file size.

use crate::error::GroupError;
use crate::pipeline::render::{open_document, pdfium, PdfiumBackend};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Writes a new document made of some pages of a source document.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Copy `page_numbers` (1-indexed, in the given order) of `source` into
    /// a new document at `destination`, replacing any file already there.
    async fn extract(
        &self,
        source: &Path,
        page_numbers: &[usize],
        destination: &Path,
    ) -> Result<(), GroupError>;
}

#[async_trait]
impl PageExtractor for PdfiumBackend {
    async fn extract(
        &self,
        source: &Path,
        page_numbers: &[usize],
        destination: &Path,
    ) -> Result<(), GroupError> {
        let backend = self.clone();
        let source = source.to_path_buf();
        let pages = page_numbers.to_vec();
        let dest = destination.to_path_buf();

        tokio::task::spawn_blocking(move || backend.extract_blocking(&source, &pages, &dest))
            .await
            .map_err(|e| GroupError::ExtractionFailed {
                path: destination.to_path_buf(),
                pages: page_numbers.to_vec(),
                detail: format!("extraction task panicked: {}", e),
            })?
    }
}

impl PdfiumBackend {
    fn extract_blocking(
        &self,
        source: &Path,
        page_numbers: &[usize],
        destination: &Path,
    ) -> Result<(), GroupError> {
        let failed = |detail: String| GroupError::ExtractionFailed {
            path: destination.to_path_buf(),
            pages: page_numbers.to_vec(),
            detail,
        };

        if page_numbers.is_empty() {
            return Err(failed("no pages selected".into()));
        }

        let pdfium = pdfium(self.library_dir.as_deref()).map_err(|e| failed(e.to_string()))?;
        let src = open_document(pdfium, source, self.password.as_deref())
            .map_err(|e| failed(e.to_string()))?;
        let total = src.pages().len() as usize;

        let mut out = pdfium
            .create_new_pdf()
            .map_err(|e| failed(format!("{:?}", e)))?;

        for (position, &page_num) in page_numbers.iter().enumerate() {
            if page_num == 0 || page_num > total {
                return Err(failed(format!(
                    "page {page_num} out of range (source has {total})"
                )));
            }
            out.pages_mut()
                .copy_page_from_document(
                    &src,
                    (page_num - 1) as PdfPageIndex,
                    position as PdfPageIndex,
                )
                .map_err(|e| failed(format!("copying page {page_num}: {:?}", e)))?;
        }

        out.save_to_file(destination)
            .map_err(|e| failed(format!("{:?}", e)))?;

        debug!(
            "Wrote pages {:?} of {} to {}",
            page_numbers,
            source.display(),
            destination.display()
        );
        Ok(())
    }
}
