//! # policy-extract
//!
//! Pull structured metadata out of insurance-policy PDFs with a chat-style
//! LLM and accumulate the results, one row per document, in an XLSX report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL
//!  │
//!  ├─ 1. Input     validate the name, read the file or download the URL
//!  ├─ 2. Text      concatenate the text of every page (lopdf)
//!  ├─ 3. Prompt    embed the text in the fixed extraction template
//!  ├─ 4. LLM       one chat-completion call, JSON-object response format
//!  ├─ 5. Parse     strip stray ```json fences, parse, validate 14 keys
//!  └─ 6. Report    append a row to the workbook and restyle it
//! ```
//!
//! Documents are processed one at a time; the only durable state is the
//! report file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use policy_extract::{extract_policy, ExtractorConfig, InputSource, OpenAiChatClient, ReportWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractorConfig::builder()
//!         .api_key(std::env::var("LLM_API_KEY")?)
//!         .build()?;
//!     let client = OpenAiChatClient::new(&config)?;
//!
//!     let source = InputSource::classify("policies/anesthesia.pdf")?;
//!     let record = extract_policy(&source, &client, &config).await?;
//!
//!     ReportWriter::from_config(&config).append(&record)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `policy-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod opener;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder, LoadFailurePolicy};
pub use error::{ExtractError, FailureKind};
pub use extract::{extract_policy, extract_policy_from_bytes};
pub use opener::{FileOpener, OsFamily, SystemOpener};
pub use pipeline::input::InputSource;
pub use pipeline::llm::{CompletionClient, OpenAiChatClient};
pub use pipeline::report::{AppendOutcome, ReportTable, ReportWriter};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use record::PolicyRecord;
pub use session::{acquire_api_key, Console, DocumentOutcome, Session, SessionSummary};
