//! External collaborators of the splitting core.
//!
//! The core (classification, grouping, planning) never touches a PDF or an
//! image. Everything that does lives here, behind three traits so tests can
//! substitute fakes:
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ recognize ──▶ normalise      extract
//! (dir)    (pdfium)   (PNG)     (tesseract/VLM)  (cleanup)    (pdfium)
//! ```
//!
//! 1. [`input`]    : list candidate scans and check their `%PDF` magic
//! 2. [`render`]   : [`render::Rasterizer`]: page count and page images
//! 3. [`encode`]   : PNG bytes for tesseract, base64 for the vision model
//! 4. [`recognize`]: [`recognize::TextRecognizer`]: page image to text
//! 5. [`normalise`]: deterministic cleanup of recognised text
//! 6. [`extract`]  : [`extract::PageExtractor`]: selected pages to a new PDF

pub mod encode;
pub mod extract;
pub mod input;
pub mod normalise;
pub mod recognize;
pub mod render;
