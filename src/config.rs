//! Configuration for a splitting run.
//!
//! Every knob lives in [`SplitterConfig`], built through
//! [`SplitterConfigBuilder`]. The config is passed explicitly into the
//! processor and the batch entry points; nothing in the library reads
//! process-wide state (environment variables are the CLI's business).
//!
//! # Example
//! ```rust
//! use scan_splitter::{SplitterConfig, WritePolicy};
//!
//! let config = SplitterConfig::builder()
//!     .input_dir("scans")
//!     .run_root("out/splits")
//!     .keyed_root("out/pilots")
//!     .keyed_policy(WritePolicy::SkipIfExists)
//!     .concurrency(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.dpi, 300);
//! ```

use crate::error::SplitError;
use crate::planner::{OutputLayout, WritePolicy};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;

/// Configuration for splitting a directory of scans.
///
/// Built via [`SplitterConfig::builder()`] or [`SplitterConfig::default()`].
#[derive(Clone)]
pub struct SplitterConfig {
    /// Directory scanned (non-recursively) for input documents. Default: `scans`.
    pub input_dir: PathBuf,

    /// File extension of input documents, matched case-insensitively. Default: `pdf`.
    pub input_extension: String,

    /// Output roots and naming.
    pub layout: OutputLayout,

    /// Policy for run outputs. Default: overwrite.
    ///
    /// Re-running on the same scan replaces that scan's earlier run outputs.
    pub run_policy: WritePolicy,

    /// Policy for keyed outputs. Default: skip-if-exists.
    ///
    /// Keyed outputs share one namespace across all scans, so an existing
    /// report for the same quotation and version is never replaced.
    pub keyed_policy: WritePolicy,

    /// Number of documents processed at once. Default: 4.
    pub concurrency: usize,

    /// Number of pages of one document recognised at once. Default: 1.
    ///
    /// Tesseract is CPU-bound and already multi-threaded; raise this for
    /// the vision recognizer, whose calls are network-bound.
    pub page_concurrency: usize,

    /// Rasterisation DPI. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for 300 DPI input; lower values lose small print.
    pub dpi: u32,

    /// Cap on either edge of a rendered page, in pixels. Default: 5000.
    ///
    /// A 300 DPI A4 page is about 2480 × 3508 px. The cap only kicks in for
    /// oversized scans.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted scans.
    pub password: Option<String>,

    /// Directory holding the pdfium shared library. `None` uses the system
    /// library search path.
    pub pdfium_library_dir: Option<PathBuf>,

    /// Which engine turns page images into text. Default: tesseract.
    pub recognizer: RecognizerKind,

    /// Tesseract executable. Default: `tesseract` (looked up on `PATH`).
    pub tesseract_cmd: PathBuf,

    /// Tesseract language(s), e.g. `eng` or `eng+deu`. `None` uses
    /// tesseract's default.
    pub tesseract_lang: Option<String>,

    /// Per-page recognition timeout in seconds. Default: 120.
    pub recognition_timeout_secs: u64,

    /// Vision model identifier, e.g. `gpt-4.1-nano`.
    pub model: Option<String>,

    /// Vision provider name (e.g. `openai`, `anthropic`, `ollama`).
    pub provider_name: Option<String>,

    /// Pre-constructed vision provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the vision recognizer. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens per transcribed page. Default: 4096.
    pub max_tokens: usize,

    /// Retries after a failed vision call. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom transcription prompt for the vision recognizer.
    pub system_prompt: Option<String>,

    /// Plan and report without creating directories or writing outputs.
    pub dry_run: bool,

    /// Receives batch, document and page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("scans"),
            input_extension: "pdf".into(),
            layout: OutputLayout::default(),
            run_policy: WritePolicy::Overwrite,
            keyed_policy: WritePolicy::SkipIfExists,
            concurrency: 4,
            page_concurrency: 1,
            dpi: 300,
            max_rendered_pixels: 5000,
            password: None,
            pdfium_library_dir: None,
            recognizer: RecognizerKind::default(),
            tesseract_cmd: PathBuf::from("tesseract"),
            tesseract_lang: None,
            recognition_timeout_secs: 120,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            dry_run: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitterConfig")
            .field("input_dir", &self.input_dir)
            .field("input_extension", &self.input_extension)
            .field("layout", &self.layout)
            .field("run_policy", &self.run_policy)
            .field("keyed_policy", &self.keyed_policy)
            .field("concurrency", &self.concurrency)
            .field("page_concurrency", &self.page_concurrency)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_library_dir", &self.pdfium_library_dir)
            .field("recognizer", &self.recognizer)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("tesseract_lang", &self.tesseract_lang)
            .field("recognition_timeout_secs", &self.recognition_timeout_secs)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("dry_run", &self.dry_run)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitterConfig {
    /// Create a new builder for `SplitterConfig`.
    pub fn builder() -> SplitterConfigBuilder {
        SplitterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitterConfig`].
#[derive(Debug)]
pub struct SplitterConfigBuilder {
    config: SplitterConfig,
}

impl SplitterConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn input_extension(mut self, ext: impl Into<String>) -> Self {
        let ext: String = ext.into();
        self.config.input_extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn layout(mut self, layout: OutputLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn run_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.layout.run_root = dir.into();
        self
    }

    pub fn keyed_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.layout.keyed_root = dir.into();
        self
    }

    pub fn run_policy(mut self, policy: WritePolicy) -> Self {
        self.config.run_policy = policy;
        self
    }

    pub fn keyed_policy(mut self, policy: WritePolicy) -> Self {
        self.config.keyed_policy = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn page_concurrency(mut self, n: usize) -> Self {
        self.config.page_concurrency = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(MIN_DPI, MAX_DPI);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_dir = Some(dir.into());
        self
    }

    pub fn recognizer(mut self, kind: RecognizerKind) -> Self {
        self.config.recognizer = kind;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn tesseract_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.tesseract_lang = Some(lang.into());
        self
    }

    pub fn recognition_timeout_secs(mut self, secs: u64) -> Self {
        self.config.recognition_timeout_secs = secs;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitterConfig, SplitError> {
        let c = &self.config;
        if c.dpi < MIN_DPI || c.dpi > MAX_DPI {
            return Err(SplitError::InvalidConfig(format!(
                "DPI must be {MIN_DPI}–{MAX_DPI}, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 || c.page_concurrency == 0 {
            return Err(SplitError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.input_extension.is_empty() {
            return Err(SplitError::InvalidConfig(
                "Input extension must not be empty".into(),
            ));
        }
        if c.recognition_timeout_secs == 0 {
            return Err(SplitError::InvalidConfig(
                "Recognition timeout must be ≥ 1 second".into(),
            ));
        }
        if c.layout.run_file_prefix.contains(['/', '\\'])
            || c.layout.keyed_dir_prefix.contains(['/', '\\'])
            || c.layout.keyed_file_prefix.contains(['/', '\\'])
        {
            return Err(SplitError::InvalidConfig(
                "Output name prefixes must not contain path separators".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Engine used to recognise page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerKind {
    /// Local `tesseract` executable. (default)
    #[default]
    Tesseract,
    /// Vision-language model through `edgequake-llm`.
    Vision,
}

impl fmt::Display for RecognizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecognizerKind::Tesseract => "tesseract",
            RecognizerKind::Vision => "vision",
        })
    }
}

impl FromStr for RecognizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" | "ocr" => Ok(RecognizerKind::Tesseract),
            "vision" | "llm" | "vlm" => Ok(RecognizerKind::Vision),
            other => Err(format!(
                "unknown recognizer '{other}' (expected tesseract or vision)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SplitterConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.page_concurrency, 1);
        assert_eq!(c.dpi, 300);
        assert_eq!(c.run_policy, WritePolicy::Overwrite);
        assert_eq!(c.keyed_policy, WritePolicy::SkipIfExists);
        assert_eq!(c.recognizer, RecognizerKind::Tesseract);
        assert!(!c.dry_run);
    }

    #[test]
    fn builder_clamps() {
        let c = SplitterConfig::builder()
            .dpi(10_000)
            .concurrency(0)
            .page_concurrency(0)
            .max_rendered_pixels(3)
            .build()
            .unwrap();
        assert_eq!(c.dpi, MAX_DPI);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.page_concurrency, 1);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn extension_drops_leading_dot() {
        let c = SplitterConfig::builder()
            .input_extension(".PDF")
            .build()
            .unwrap();
        assert_eq!(c.input_extension, "PDF");
    }

    #[test]
    fn empty_extension_rejected() {
        let err = SplitterConfig::builder()
            .input_extension("")
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(SplitterConfig::builder()
            .recognition_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn prefix_with_separator_rejected() {
        let layout = OutputLayout {
            keyed_dir_prefix: "QB/".into(),
            ..Default::default()
        };
        assert!(SplitterConfig::builder().layout(layout).build().is_err());
    }

    #[test]
    fn roots_are_set_through_layout() {
        let c = SplitterConfig::builder()
            .run_root("/tmp/runs")
            .keyed_root("/tmp/keyed")
            .build()
            .unwrap();
        assert_eq!(c.layout.run_root, PathBuf::from("/tmp/runs"));
        assert_eq!(c.layout.keyed_root, PathBuf::from("/tmp/keyed"));
        assert_eq!(c.layout.run_file_prefix, "CoA_");
    }

    #[test]
    fn debug_redacts_password() {
        let c = SplitterConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn recognizer_kind_parses() {
        assert_eq!("Tesseract".parse::<RecognizerKind>(), Ok(RecognizerKind::Tesseract));
        assert_eq!("vision".parse::<RecognizerKind>(), Ok(RecognizerKind::Vision));
        assert!("magic".parse::<RecognizerKind>().is_err());
        assert_eq!(RecognizerKind::Vision.to_string(), "vision");
    }
}
