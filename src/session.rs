//! The interactive driver: credential acquisition and the document loop.
//!
//! A [`Session`] prompts for one document at a time, runs the extraction
//! pipeline, appends the record to the report and optionally opens the
//! report. Any per-document failure is printed and the loop continues; only
//! console I/O errors end a session early.
//!
//! The console is generic over `BufRead`/`Write`, so tests drive a session
//! with a scripted input buffer and inspect what was printed.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::extract::extract_policy;
use crate::opener::FileOpener;
use crate::pipeline::input::InputSource;
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::report::{AppendOutcome, ReportWriter};
use crate::progress::{observe, Stage};
use crate::record::PolicyRecord;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

const API_KEY_PROMPT: &str = "Please enter your LLM API Key: ";

/// Line-oriented operator console.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    /// Console over the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `message` without a newline and read one line.
    ///
    /// Returns `None` at end of input. The line terminator is removed.
    pub fn prompt(&mut self, message: &str) -> Result<Option<String>, ExtractError> {
        write!(self.output, "{}", message).map_err(ExtractError::Console)?;
        self.output.flush().map_err(ExtractError::Console)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(ExtractError::Console)?;
        if read == 0 {
            // Keep the next output off the prompt line.
            writeln!(self.output).map_err(ExtractError::Console)?;
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    /// Print one line.
    pub fn say(&mut self, line: impl Display) -> Result<(), ExtractError> {
        writeln!(self.output, "{}", line).map_err(ExtractError::Console)
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

/// Resolve the API credential: use `provided` if non-empty, otherwise ask once.
///
/// An empty answer or end of input is [`ExtractError::MissingCredential`].
pub fn acquire_api_key<R: BufRead, W: Write>(
    provided: Option<String>,
    console: &mut Console<R, W>,
) -> Result<String, ExtractError> {
    if let Some(key) = provided.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    match console.prompt(API_KEY_PROMPT)? {
        Some(answer) if !answer.trim().is_empty() => Ok(answer.trim().to_string()),
        _ => Err(ExtractError::MissingCredential),
    }
}

/// What happened to one operator input.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// Input refused before any work: missing file or not a PDF.
    Rejected(ExtractError),
    /// A pipeline stage failed; the report was not changed by this document.
    Failed(ExtractError),
    /// The record was appended to the report.
    Saved {
        record: PolicyRecord,
        outcome: AppendOutcome,
    },
}

/// Per-session tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub saved: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl SessionSummary {
    fn record(&mut self, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Rejected(_) => self.rejected += 1,
            DocumentOutcome::Failed(_) => self.failed += 1,
            DocumentOutcome::Saved { .. } => self.saved += 1,
        }
    }
}

/// One interactive run over any number of documents.
pub struct Session {
    config: ExtractorConfig,
    client: Arc<dyn CompletionClient>,
    opener: Box<dyn FileOpener>,
    writer: ReportWriter,
}

impl Session {
    pub fn new(
        config: ExtractorConfig,
        client: Arc<dyn CompletionClient>,
        opener: Box<dyn FileOpener>,
    ) -> Self {
        let writer = ReportWriter::from_config(&config);
        Self {
            config,
            client,
            opener,
            writer,
        }
    }

    /// Prompt for documents until the quit sentinel or end of input.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<SessionSummary, ExtractError> {
        let document_prompt = format!(
            "Please enter the LOCAL path or URL to the insurance policy PDF (or '{}' to quit): ",
            self.config.quit_sentinel
        );
        let mut summary = SessionSummary::default();

        while let Some(line) = console.prompt(&document_prompt)? {
            let input = line.trim();
            if self.config.is_quit(input) {
                break;
            }
            let outcome = self.process(input, console).await?;
            summary.record(&outcome);
            console.say("")?;
        }

        info!(
            "Session finished: {} saved, {} failed, {} rejected",
            summary.saved, summary.failed, summary.rejected
        );
        console.say(format!(
            "Session finished: {} saved, {} failed, {} rejected.",
            summary.saved, summary.failed, summary.rejected
        ))?;
        Ok(summary)
    }

    /// Handle one operator input end to end.
    ///
    /// The outer `Err` is reserved for console failures; everything else
    /// becomes a [`DocumentOutcome`].
    pub async fn process<R: BufRead, W: Write>(
        &self,
        input: &str,
        console: &mut Console<R, W>,
    ) -> Result<DocumentOutcome, ExtractError> {
        let source = match InputSource::classify(input) {
            Ok(source) => source,
            Err(e) => {
                console.say(format!("Error: {}", e))?;
                return Ok(DocumentOutcome::Rejected(e));
            }
        };

        console.say(format!("Processing {}...", source.display_name()))?;
        let record = match extract_policy(&source, self.client.as_ref(), &self.config).await {
            Ok(record) => record,
            Err(e) => {
                console.say(format!("Error: {}", e))?;
                if let Some(raw) = e.raw_reply() {
                    console.say("LLM Response:")?;
                    console.say(raw)?;
                }
                // The file can vanish between classification and the read.
                if e.is_rejection() {
                    return Ok(DocumentOutcome::Rejected(e));
                }
                return Ok(DocumentOutcome::Failed(e));
            }
        };

        match serde_json::to_string_pretty(&record) {
            Ok(pretty) => {
                console.say("\n--- Extracted Information (JSON) ---")?;
                console.say(pretty)?;
                console.say("-------------------------------------")?;
            }
            Err(e) => warn!("Could not render extracted record: {}", e),
        }

        console.say("\n--- Attempting to update report ---")?;
        let outcome = match self.write_report(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                console.say(format!("Error: {}", e))?;
                return Ok(DocumentOutcome::Failed(e));
            }
        };

        if outcome.replaced_unreadable {
            console.say(format!(
                "Warning: the existing {} could not be read and now holds only this policy.",
                self.writer.path().display()
            ))?;
        }
        console.say(format!(
            "Successfully updated {} with new policy data.",
            self.writer.path().display()
        ))?;
        if !outcome.styled {
            console.say("Styling could not be applied; the data was saved without it.")?;
        }

        if self.config.offer_open {
            self.offer_open(console)?;
        }

        Ok(DocumentOutcome::Saved { record, outcome })
    }

    async fn write_report(&self, record: &PolicyRecord) -> Result<AppendOutcome, ExtractError> {
        let writer = self.writer.clone();
        let record = record.clone();
        observe(
            self.config.progress_callback.as_ref(),
            Stage::Report,
            async move {
                tokio::task::spawn_blocking(move || writer.append(&record))
                    .await
                    .map_err(|e| ExtractError::Internal(format!("Report task panicked: {}", e)))?
            },
        )
        .await
    }

    fn offer_open<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<(), ExtractError> {
        let path = self.writer.path();
        let question = format!("Do you want to open {} now? (y/n): ", path.display());
        let answer = console.prompt(&question)?.unwrap_or_default();
        if !answer.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
        if let Err(e) = self.opener.open(path) {
            warn!("{}", e);
            console.say(format!("Error: {}", e))?;
        }
        Ok(())
    }
}
