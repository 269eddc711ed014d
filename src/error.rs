//! Error types for the scan-splitter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SplitError`]: **Fatal** for one document (unreadable PDF, a page that
//!   could not be rasterised or recognised) or, when returned from the batch
//!   entry points, for the whole run (input directory missing, recogniser
//!   not installed). A document that fails this way produces no output at
//!   all; sibling documents in the same batch are unaffected.
//!
//! * [`GroupError`]: **Non-fatal**: writing one output group failed
//!   (directory creation, extraction, persist). Stored inside
//!   [`crate::output::GroupOutcome`] so the remaining groups of the same
//!   document are still written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan-splitter library.
///
/// Output-level failures use [`GroupError`] and are stored in
/// [`crate::output::GroupOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The configured input directory does not exist.
    #[error("Input directory not found: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// The input directory exists but could not be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page count could not be read.
    #[error("Cannot read page count of '{path}': {detail}")]
    PageCountFailed { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Recognition errors ────────────────────────────────────────────────
    /// The recognition engine failed on a page.
    #[error("Text recognition failed for page {page}: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The recognition engine did not answer in time.
    #[error("Text recognition timed out after {secs}s on page {page}")]
    RecognitionTimeout { page: usize, secs: u64 },

    /// The recognition engine is not installed or not runnable.
    #[error("Recogniser '{recognizer}' is not available.\n{hint}")]
    RecognizerNotConfigured { recognizer: String, hint: String },

    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium system-wide, or point --pdfium-lib (SCANSPLIT_PDFIUM_LIB)\n\
at the directory that contains it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single output group.
///
/// Stored in [`crate::output::OutputStatus::Failed`]. The document's other
/// groups are still materialised.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum GroupError {
    /// The destination directory could not be created.
    #[error("Cannot create directory '{path}': {detail}")]
    CreateDirFailed { path: PathBuf, detail: String },

    /// The staging file next to the target could not be created.
    #[error("Cannot create staging file in '{dir}': {detail}")]
    StagingFailed { dir: PathBuf, detail: String },

    /// The extraction tool failed to write the selected pages.
    #[error("Extracting pages {pages:?} to '{path}' failed: {detail}")]
    ExtractionFailed {
        path: PathBuf,
        pages: Vec<usize>,
        detail: String,
    },

    /// The staged file could not be moved onto the target path.
    #[error("Cannot persist '{path}': {detail}")]
    PersistFailed { path: PathBuf, detail: String },
}
