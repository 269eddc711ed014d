//! CLI binary for scan-splitter.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SplitterConfig` and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan_splitter::{
    inspect_directory, split_directory, BatchSummary, GroupOutcome, OutputStatus, ProgressCallback,
    RecognizerKind, SplitProgressCallback, SplitterConfig, WritePolicy,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar counting pages across all documents, plus a
/// log line per output and per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
    pages_total: AtomicUsize,
    failed_documents: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            pages_total: AtomicUsize::new(0),
            failed_documents: AtomicUsize::new(0),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Splitting {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, source: &Path, total_pages: usize) {
        // Page totals only become known one document at a time.
        let total = self.pages_total.fetch_add(total_pages, Ordering::SeqCst) + total_pages;
        self.bar.set_length(total as u64);
        self.bar.set_prefix("Recognising");
        self.bar.set_message(file_name(source));
    }

    fn on_page_complete(&self, _source: &Path, _page: usize, _total: usize, _len: usize) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, source: &Path, page_num: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {} page {}/{}  {}",
            red("✗"),
            file_name(source),
            page_num,
            total,
            red(&msg),
        ));
    }

    fn on_output(&self, _source: &Path, outcome: &GroupOutcome) {
        let target = outcome.target.display().to_string();
        let line = match outcome.status {
            OutputStatus::Written => format!("  {} {}", green("✓"), target),
            OutputStatus::Planned => format!("  {} {}", cyan("·"), target),
            OutputStatus::Skipped { ref reason } => {
                format!("  {} {}  {}", yellow("↷"), target, dim(reason))
            }
            OutputStatus::Failed { ref error } => {
                format!("  {} {}  {}", red("✗"), target, red(&error.to_string()))
            }
        };
        self.bar.println(line);
    }

    fn on_document_complete(&self, source: &Path, success: bool) {
        if !success {
            self.failed_documents.fetch_add(1, Ordering::SeqCst);
            self.bar
                .println(format!("{} {} aborted", red("✘"), file_name(source)));
        }
    }

    fn on_batch_complete(&self, total_documents: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = self.failed_documents.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} document(s) split",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) split  ({} aborted)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split every PDF in ./scans
  scansplit

  # Another input directory and output roots
  scansplit --input-dir /mnt/scanner --run-root out/coa --keyed-root out/pilots

  # Show what would be written without writing anything
  scansplit --dry-run

  # Page counts and metadata only
  scansplit --inspect

  # Use a vision model instead of tesseract
  scansplit --recognizer vision --provider openai --model gpt-4.1-mini

  # Machine-readable summary
  scansplit --json > summary.json

OUTPUTS:
  <run-root>/<document>/CoA_<n>.pdf          one per certificate run, overwritten
  <keyed-root>/QB-<id>/PilotReport_V<v>.pdf  one per quotation + version, never replaced

ENVIRONMENT VARIABLES:
  SCANSPLIT_*             Every flag has a SCANSPLIT_ equivalent (see --help)
  PDFIUM_DYNAMIC_LIB_PATH Directory containing libpdfium (same as --pdfium-dir)
  OPENAI_API_KEY          Enables the vision recognizer with OpenAI
  EDGEQUAKE_LLM_PROVIDER  Vision provider override (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Vision model override
  RUST_LOG                Log filter (overrides -v / -q)

SETUP:
  1. Install tesseract:  apt install tesseract-ocr   (or brew install tesseract)
  2. Install pdfium:     place libpdfium next to the binary, or pass --pdfium-dir
  3. Split:              scansplit --input-dir scans
"#;

/// Split scanned PDF batches into certificate and pilot-report documents.
#[derive(Parser, Debug)]
#[command(
    name = "scansplit",
    version,
    about = "Split scanned PDF batches into certificate and pilot-report documents",
    long_about = "Reads every page of every PDF in the input directory with OCR, then writes \
each certificate run (a page headed 'Certificate of Analysis' or 'Specification Sheet' up to \
the next such page) and each pilot report (pages mentioning PILOT with the same quotation \
number and version) to its own PDF.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for input PDFs (non-recursive).
    #[arg(short, long, env = "SCANSPLIT_INPUT_DIR", default_value = "scans")]
    input_dir: PathBuf,

    /// Input file extension, matched case-insensitively.
    #[arg(long, env = "SCANSPLIT_EXTENSION", default_value = "pdf")]
    extension: String,

    /// Root directory for certificate runs.
    #[arg(long, env = "SCANSPLIT_RUN_ROOT", default_value = "splits")]
    run_root: PathBuf,

    /// Root directory for pilot reports.
    #[arg(long, env = "SCANSPLIT_KEYED_ROOT", default_value = "pilots")]
    keyed_root: PathBuf,

    /// Write policy for certificate runs: overwrite or skip-if-exists.
    #[arg(long, env = "SCANSPLIT_RUN_POLICY", default_value = "overwrite")]
    run_policy: WritePolicy,

    /// Write policy for pilot reports: overwrite or skip-if-exists.
    #[arg(long, env = "SCANSPLIT_KEYED_POLICY", default_value = "skip-if-exists")]
    keyed_policy: WritePolicy,

    /// Documents processed at once.
    #[arg(short, long, env = "SCANSPLIT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Pages of one document recognised at once.
    #[arg(long, env = "SCANSPLIT_PAGE_CONCURRENCY", default_value_t = 1)]
    page_concurrency: usize,

    /// Rasterisation DPI (72–600).
    #[arg(long, env = "SCANSPLIT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Cap on the longer side of a rendered page, in pixels.
    #[arg(long, env = "SCANSPLIT_MAX_PIXELS", default_value_t = 5000)]
    max_pixels: u32,

    /// PDF user password for encrypted scans.
    #[arg(long, env = "SCANSPLIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_DYNAMIC_LIB_PATH")]
    pdfium_dir: Option<PathBuf>,

    /// Text recognizer: tesseract or vision.
    #[arg(long, env = "SCANSPLIT_RECOGNIZER", default_value = "tesseract")]
    recognizer: RecognizerKind,

    /// Tesseract executable.
    #[arg(long, env = "SCANSPLIT_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "SCANSPLIT_LANG")]
    lang: Option<String>,

    /// Per-page recognition timeout in seconds.
    #[arg(long, env = "SCANSPLIT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Vision model ID (vision recognizer only).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Vision provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Retries per page on vision-model failure.
    #[arg(long, env = "SCANSPLIT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Path to a text file with a custom transcription prompt.
    #[arg(long, env = "SCANSPLIT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Plan outputs without writing anything.
    #[arg(long, env = "SCANSPLIT_DRY_RUN")]
    dry_run: bool,

    /// Print page counts and metadata only.
    #[arg(long)]
    inspect: bool,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "SCANSPLIT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "SCANSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCANSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCANSPLIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SplitProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Inspect mode ─────────────────────────────────────────────────────
    if cli.inspect {
        let infos = inspect_directory(&config)
            .await
            .context("Failed to inspect input directory")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&infos).context("Failed to serialise metadata")?
            );
        } else {
            for info in &infos {
                println!(
                    "{:<40} {:>4} pages  PDF {}  {}",
                    file_name(&info.path),
                    info.page_count,
                    info.pdf_version,
                    dim(info.producer.as_deref().unwrap_or("")),
                );
            }
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = split_directory(&config)
        .await
        .context("Splitting failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        print_summary(&summary, cli.dry_run);
    }

    Ok(())
}

fn print_summary(summary: &BatchSummary, dry_run: bool) {
    let s = &summary.stats;
    if s.total_documents == 0 {
        eprintln!("{} no input documents found", yellow("⚠"));
        return;
    }
    for report in summary.documents.iter().filter(|r| !r.is_success()) {
        eprintln!(
            "  {} {}  {}",
            red("✗"),
            file_name(&report.source),
            red(report.error.as_deref().unwrap_or("failed"))
        );
    }
    if dry_run {
        eprintln!(
            "{}  {} output(s) planned, {} skipped  {}ms",
            cyan("·"),
            s.outputs_planned,
            s.outputs_skipped,
            s.total_duration_ms
        );
    } else {
        eprintln!(
            "{}  {}/{} documents  {} written, {} skipped, {} failed  {}ms",
            if s.failed == 0 && s.outputs_failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            s.succeeded,
            s.total_documents,
            s.outputs_written,
            s.outputs_skipped,
            s.outputs_failed,
            s.total_duration_ms
        );
    }
}

/// Map CLI args to `SplitterConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitterConfig> {
    let mut builder = SplitterConfig::builder()
        .input_dir(&cli.input_dir)
        .input_extension(&cli.extension)
        .run_root(&cli.run_root)
        .keyed_root(&cli.keyed_root)
        .run_policy(cli.run_policy)
        .keyed_policy(cli.keyed_policy)
        .concurrency(cli.concurrency)
        .page_concurrency(cli.page_concurrency)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .recognizer(cli.recognizer)
        .tesseract_cmd(&cli.tesseract)
        .recognition_timeout_secs(cli.timeout)
        .max_retries(cli.max_retries)
        .dry_run(cli.dry_run);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref dir) = cli.pdfium_dir {
        builder = builder.pdfium_library_dir(dir);
    }
    if let Some(ref lang) = cli.lang {
        builder = builder.tesseract_lang(lang);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
