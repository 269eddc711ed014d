//! Text recognition: turn a rendered page into a string.
//!
//! Two engines implement [`TextRecognizer`]:
//!
//! * [`TesseractRecognizer`] (default) runs the local `tesseract`
//!   executable, one process per page.
//! * [`VisionRecognizer`] asks a vision-language model through
//!   `edgequake-llm` for a verbatim transcription.
//!
//! Both pass their output through [`normalise_text`] so the classifier sees
//! the same shape of text whichever engine produced it.
//!
//! ## Retry strategy (vision)
//!
//! Provider errors under concurrent load (429, 503) are usually transient.
//! Calls are retried with exponential backoff (`retry_backoff_ms * 2^n`).
//! Tesseract is deterministic, so its failures are never retried.

use crate::config::{RecognizerKind, SplitterConfig};
use crate::error::SplitError;
use crate::pipeline::encode::{encode_page, encode_png};
use crate::pipeline::normalise::normalise_text;
use crate::prompts::{transcription_request, DEFAULT_TRANSCRIPTION_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Produces the recognised text of one page image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognise `image`, the rendering of 1-indexed page `page_num`.
    ///
    /// An empty string is a valid result (blank page). An error aborts the
    /// page's document.
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, SplitError>;
}

/// Build the recognizer selected in `config`.
///
/// Tesseract is checked with `--version` so a missing installation fails
/// the run up front instead of failing every document.
pub async fn recognizer_from_config(
    config: &SplitterConfig,
) -> Result<Arc<dyn TextRecognizer>, SplitError> {
    match config.recognizer {
        RecognizerKind::Tesseract => {
            let tesseract = TesseractRecognizer::from_config(config);
            let version = tesseract.version().await?;
            info!("Using {}", version);
            Ok(Arc::new(tesseract))
        }
        RecognizerKind::Vision => {
            let vision = VisionRecognizer::from_config(config).await?;
            info!("Using vision recognizer");
            Ok(Arc::new(vision))
        }
    }
}

// ── Tesseract ────────────────────────────────────────────────────────────────

/// Runs `tesseract <page.png> stdout` for every page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: PathBuf,
    language: Option<String>,
    dpi: u32,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            language: None,
            dpi: 300,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &SplitterConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.tesseract_lang.clone(),
            dpi: config.dpi,
            timeout: Duration::from_secs(config.recognition_timeout_secs),
        }
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `tesseract --version` and return its first output line.
    pub async fn version(&self) -> Result<String, SplitError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.not_configured(&e.to_string()))?;

        if !output.status.success() {
            return Err(self.not_configured(&format!("`--version` exited with {}", output.status)));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or("tesseract")
            .trim()
            .to_string())
    }

    fn not_configured(&self, detail: &str) -> SplitError {
        SplitError::RecognizerNotConfigured {
            recognizer: self.command.display().to_string(),
            hint: format!(
                "{detail}\nInstall tesseract-ocr, or point --tesseract (SCANSPLIT_TESSERACT) at the executable."
            ),
        }
    }

    fn args(&self, image: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![image.into(), "stdout".into()];
        if let Some(ref lang) = self.language {
            args.push("-l".into());
            args.push(lang.into());
        }
        args.push("--dpi".into());
        args.push(self.dpi.to_string().into());
        args
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, SplitError> {
        let failed = |detail: String| SplitError::RecognitionFailed {
            page: page_num,
            detail,
        };

        let png = encode_png(image).map_err(|e| failed(format!("PNG encoding failed: {e}")))?;
        let staged = tempfile::Builder::new()
            .prefix("scansplit-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| failed(format!("cannot create temp image: {e}")))?;
        tokio::fs::write(staged.path(), &png)
            .await
            .map_err(|e| failed(format!("cannot write temp image: {e}")))?;

        let start = Instant::now();
        let mut cmd = Command::new(&self.command);
        cmd.args(self.args(staged.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(SplitError::RecognitionTimeout {
                    page: page_num,
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.not_configured(&e.to_string()))
            }
            Ok(Err(e)) => return Err(failed(format!("cannot run tesseract: {e}"))),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = normalise_text(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "Page {}: tesseract returned {} bytes in {:?}",
            page_num,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

// ── Vision model ─────────────────────────────────────────────────────────────

/// Transcribes pages with a vision-language model.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout: Duration,
}

impl VisionRecognizer {
    /// Recognizer with default settings around an existing provider.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_TRANSCRIPTION_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            timeout: Duration::from_secs(120),
        }
    }

    /// Resolve the provider and copy the vision settings from `config`.
    pub async fn from_config(config: &SplitterConfig) -> Result<Self, SplitError> {
        let provider = resolve_provider(config).await?;
        Ok(Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout: Duration::from_secs(config.recognition_timeout_secs),
        })
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, SplitError> {
        let image_data = encode_page(image).map_err(|e| SplitError::RecognitionFailed {
            page: page_num,
            detail: format!("PNG encoding failed: {e}"),
        })?;

        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user_with_images(&transcription_request(page_num), vec![image_data]),
        ];
        let options = self.options();
        let start = Instant::now();
        let mut last_err: Option<SplitError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Page {}: {} input tokens, {} output tokens, {:?}",
                        page_num,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(normalise_text(&response.content));
                }
                Ok(Err(e)) => {
                    warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                    last_err = Some(SplitError::RecognitionFailed {
                        page: page_num,
                        detail: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!("Page {}: attempt {} timed out", page_num, attempt + 1);
                    last_err = Some(SplitError::RecognitionTimeout {
                        page: page_num,
                        secs: self.timeout.as_secs(),
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| SplitError::RecognitionFailed {
            page: page_num,
            detail: "no attempt was made".into(),
        }))
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SplitError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SplitError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. the pre-built `config.provider`;
/// 2. `config.provider_name` with `config.model`;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
/// 4. OpenAI when `OPENAI_API_KEY` is set;
/// 5. whatever [`ProviderFactory::from_env`] detects.
async fn resolve_provider(config: &SplitterConfig) -> Result<Arc<dyn LLMProvider>, SplitError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SplitError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
