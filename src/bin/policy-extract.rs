//! CLI binary for policy-extract.
//!
//! A thin shim over the library crate: maps CLI flags to `ExtractorConfig`,
//! resolves the API key and hands the terminal to an interactive `Session`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use policy_extract::{
    acquire_api_key, Console, ExtractionProgressCallback, ExtractorConfig, LoadFailurePolicy,
    OpenAiChatClient, ProgressCallback, Session, Stage, SystemOpener,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One spinner per pipeline stage, drawn on stderr and cleared before the
/// session prints its own output.
struct SpinnerProgress {
    current: Mutex<Option<(ProgressBar, Instant)>>,
}

impl SpinnerProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(None),
        })
    }

    fn finish(&self) -> Option<Duration> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.take().map(|(bar, started)| {
            bar.finish_and_clear();
            started.elapsed()
        })
    }
}

impl ExtractionProgressCallback for SpinnerProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.finish();
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("{}…", stage.label()));
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some((bar, Instant::now()));
    }

    fn on_stage_complete(&self, stage: Stage) {
        if let Some(elapsed) = self.finish() {
            eprintln!(
                "  {} {}",
                dim(stage.label()),
                dim(&format!("{:.1}s", elapsed.as_secs_f64()))
            );
        }
    }

    fn on_stage_error(&self, stage: Stage, _error: &str) {
        self.finish();
        eprintln!("  {} {}", red("✗"), red(stage.label()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive session, key from the environment
  export LLM_API_KEY=sk-...
  policy-extract

  # Write to a different report and skip the "open now?" question
  policy-extract -o reports/q3.xlsx --no-open-prompt

  # Any OpenAI-compatible endpoint
  policy-extract --endpoint http://localhost:11434/v1/chat/completions --model llama3.1

At the prompt, enter a local PDF path or an http(s) URL ending in .pdf.
Enter q to quit. Each extracted policy is appended as one row to the report.

ENVIRONMENT VARIABLES:
  LLM_API_KEY             Bearer key for the completion endpoint (prompted if unset)
  LLM_MODEL               Model identifier
  LLM_ENDPOINT            Chat-completions URL
  POLICY_REPORT           Report workbook path
  RUST_LOG                Log filter, overrides -v/-q
"#;

/// Extract insurance-policy metadata from PDFs into an XLSX report.
#[derive(Parser, Debug)]
#[command(
    name = "policy-extract",
    version,
    about = "Extract insurance-policy metadata from PDFs into an XLSX report",
    long_about = "Interactively read insurance-policy PDFs (local files or URLs), ask a chat-completion \
model to extract payer, policy, coding and reimbursement details as JSON, and append one row per \
policy to an XLSX report.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// API key for the completion endpoint. Prompted for when absent.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier.
    #[arg(long, env = "LLM_MODEL", default_value = policy_extract::config::DEFAULT_MODEL)]
    model: String,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "LLM_ENDPOINT", default_value = policy_extract::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Report workbook to append to.
    #[arg(short = 'o', long, env = "POLICY_REPORT", default_value = policy_extract::config::DEFAULT_REPORT_PATH)]
    report: PathBuf,

    /// Completion call timeout in seconds.
    #[arg(long, env = "POLICY_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// PDF download timeout in seconds (no timeout when unset).
    #[arg(long, env = "POLICY_DOWNLOAD_TIMEOUT")]
    download_timeout: Option<u64>,

    /// Input that ends the session.
    #[arg(long, default_value = "q")]
    quit_sentinel: String,

    /// Do not ask whether to open the report after each write.
    #[arg(long)]
    no_open_prompt: bool,

    /// Fail the append instead of replacing an unreadable report.
    #[arg(long)]
    strict_append: bool,

    /// Characters of the raw model reply shown in the log preview.
    #[arg(long, default_value_t = 500)]
    preview_chars: usize,

    /// Disable the stage spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Default to warnings only so log lines stay out of the prompts.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut console = Console::stdio();
    let api_key = acquire_api_key(cli.api_key.clone(), &mut console)
        .context("Cannot continue without an LLM API key")?;

    let progress: Option<ProgressCallback> = if cli.no_progress {
        None
    } else {
        Some(SpinnerProgress::new())
    };
    let config = build_config(&cli, api_key, progress)?;
    let client = OpenAiChatClient::new(&config).context("Failed to create LLM client")?;

    console
        .say(bold(&format!(
            "Appending extracted policies to {}",
            config.report_path.display()
        )))
        .context("Failed to write to stdout")?;

    let session = Session::new(config, Arc::new(client), Box::new(SystemOpener::for_host()));
    session
        .run(&mut console)
        .await
        .context("Interactive session failed")?;
    Ok(())
}

fn build_config(
    cli: &Cli,
    api_key: String,
    progress: Option<ProgressCallback>,
) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .api_key(api_key)
        .model(&cli.model)
        .endpoint(&cli.endpoint)
        .report_path(&cli.report)
        .api_timeout_secs(cli.api_timeout)
        .quit_sentinel(&cli.quit_sentinel)
        .offer_open(!cli.no_open_prompt)
        .reply_preview_chars(cli.preview_chars);

    if let Some(secs) = cli.download_timeout {
        builder = builder.download_timeout_secs(secs);
    }
    if cli.strict_append {
        builder = builder.on_load_failure(LoadFailurePolicy::Abort);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
