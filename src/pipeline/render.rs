//! Page counting and rasterisation through pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps a C++ library that is not async-aware and does
//! CPU-heavy work. Every pdfium call runs inside
//! `tokio::task::spawn_blocking` so Tokio worker threads never stall while
//! a 300 DPI page is rendered.
//!
//! ## One binding per process
//!
//! pdfium can only be bound once per process. The first call to
//! [`pdfium`] binds it (from the configured directory, else the system
//! library path) and every later call reuses that binding, whatever
//! directory it asks for.

use crate::config::SplitterConfig;
use crate::error::SplitError;
use async_trait::async_trait;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns pages of a source document into images.
///
/// Page numbers are 1-indexed, as for the external tools.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Total number of pages in `path`.
    async fn page_count(&self, path: &Path) -> Result<usize, SplitError>;

    /// Render page `page_num` of `path`.
    async fn rasterize(&self, path: &Path, page_num: usize) -> Result<DynamicImage, SplitError>;
}

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// The process-wide pdfium binding, created on first use.
pub fn pdfium(library_dir: Option<&Path>) -> Result<&'static Pdfium, SplitError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match library_dir {
            Some(dir) => {
                info!("Binding pdfium from {}", dir.display());
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                    .or_else(|_| Pdfium::bind_to_system_library())
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| SplitError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    })
}

/// Open `path`, mapping pdfium's errors to [`SplitError`].
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, SplitError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                SplitError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                SplitError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            SplitError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// pdfium-backed rasteriser, page-count reader and page extractor.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    pub(crate) library_dir: Option<PathBuf>,
    pub(crate) password: Option<String>,
    dpi: u32,
    max_rendered_pixels: u32,
}

impl PdfiumBackend {
    pub fn new(dpi: u32, max_rendered_pixels: u32) -> Self {
        Self {
            library_dir: None,
            password: None,
            dpi,
            max_rendered_pixels,
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self {
            library_dir: config.pdfium_library_dir.clone(),
            password: config.password.clone(),
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Bind pdfium now rather than on the first page.
    pub fn ensure_bound(&self) -> Result<(), SplitError> {
        pdfium(self.library_dir.as_deref()).map(|_| ())
    }

    fn render_config(&self) -> PdfRenderConfig {
        let max = self.max_rendered_pixels as i32;
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(max)
            .set_maximum_height(max)
    }
}

#[async_trait]
impl Rasterizer for PdfiumBackend {
    async fn page_count(&self, path: &Path) -> Result<usize, SplitError> {
        let backend = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || backend.page_count_blocking(&path))
            .await
            .map_err(|e| SplitError::Internal(format!("Page-count task panicked: {}", e)))?
    }

    async fn rasterize(&self, path: &Path, page_num: usize) -> Result<DynamicImage, SplitError> {
        let backend = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || backend.rasterize_blocking(&path, page_num))
            .await
            .map_err(|e| SplitError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumBackend {
    fn page_count_blocking(&self, path: &Path) -> Result<usize, SplitError> {
        let pdfium = pdfium(self.library_dir.as_deref())?;
        let document =
            open_document(pdfium, path, self.password.as_deref()).map_err(page_count_error)?;
        let total = document.pages().len() as usize;
        debug!("{}: {} pages", path.display(), total);
        Ok(total)
    }

    fn rasterize_blocking(&self, path: &Path, page_num: usize) -> Result<DynamicImage, SplitError> {
        let failed = |detail: String| SplitError::RasterisationFailed {
            page: page_num,
            detail,
        };

        let pdfium = pdfium(self.library_dir.as_deref())?;
        let document = open_document(pdfium, path, self.password.as_deref())?;
        let pages = document.pages();
        let total = pages.len() as usize;
        if page_num == 0 || page_num > total {
            return Err(failed(format!("page out of range (document has {total})")));
        }

        let page = pages
            .get((page_num - 1) as PdfPageIndex)
            .map_err(|e| failed(format!("{:?}", e)))?;
        let bitmap = page
            .render_with_config(&self.render_config())
            .map_err(|e| failed(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} of {} → {}x{} px",
            page_num,
            path.display(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Page count and document-information fields of one PDF.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfInfo {
    pub path: PathBuf,
    pub page_count: usize,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub pdf_version: String,
}

/// Read page count and metadata without rendering anything.
pub async fn inspect(path: &Path, backend: &PdfiumBackend) -> Result<PdfInfo, SplitError> {
    let path = path.to_path_buf();
    let backend = backend.clone();
    tokio::task::spawn_blocking(move || inspect_blocking(&path, &backend))
        .await
        .map_err(|e| SplitError::Internal(format!("Inspect task panicked: {}", e)))?
}

fn inspect_blocking(path: &Path, backend: &PdfiumBackend) -> Result<PdfInfo, SplitError> {
    let pdfium = pdfium(backend.library_dir.as_deref())?;
    let document = open_document(pdfium, path, backend.password.as_deref())?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(PdfInfo {
        path: path.to_path_buf(),
        page_count: document.pages().len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        pdf_version: format!("{:?}", document.version()),
    })
}

/// A document pdfium cannot open fails the page count. Password errors
/// keep their own variants so the caller can ask for one.
fn page_count_error(err: SplitError) -> SplitError {
    match err {
        SplitError::CorruptPdf { path, detail } => SplitError::PageCountFailed { path, detail },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unopenable_document_fails_the_page_count() {
        let err = page_count_error(SplitError::CorruptPdf {
            path: PathBuf::from("scans/torn.pdf"),
            detail: "PdfiumLibraryInternalError(FormatError)".into(),
        });
        assert!(matches!(
            err,
            SplitError::PageCountFailed { ref path, ref detail }
                if path == Path::new("scans/torn.pdf") && detail.contains("FormatError")
        ));
        assert!(err.to_string().starts_with("Cannot read page count of 'scans/torn.pdf'"));

        let err = page_count_error(SplitError::PasswordRequired {
            path: PathBuf::from("scans/locked.pdf"),
        });
        assert!(matches!(err, SplitError::PasswordRequired { .. }));
    }

    #[test]
    fn from_config_copies_render_settings() {
        let config = SplitterConfig::builder()
            .dpi(200)
            .max_rendered_pixels(3000)
            .password("secret")
            .pdfium_library_dir("/opt/pdfium")
            .build()
            .unwrap();
        let backend = PdfiumBackend::from_config(&config);
        assert_eq!(backend.dpi, 200);
        assert_eq!(backend.max_rendered_pixels, 3000);
        assert_eq!(backend.password.as_deref(), Some("secret"));
        assert_eq!(backend.library_dir, Some(PathBuf::from("/opt/pdfium")));
    }

    #[test]
    fn builder_style_setters() {
        let backend = PdfiumBackend::new(300, 5000)
            .with_library_dir("./lib")
            .with_password("pw");
        assert_eq!(backend.library_dir, Some(PathBuf::from("./lib")));
        assert_eq!(backend.password.as_deref(), Some("pw"));
    }
}
