//! Error types for the policy-extract library.
//!
//! Every failure in the pipeline is an [`ExtractError`]. None of them is
//! fatal to the process on its own: the interactive session reports the
//! error, abandons the current document and prompts for the next one. The
//! exceptions are [`ExtractError::MissingCredential`] and console I/O
//! failures, which end the session.
//!
//! [`ExtractError::kind`] folds the variants into the coarse
//! [`FailureKind`] taxonomy used for reporting and for the session summary.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the policy-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Local input path does not exist.
    #[error("File not found at {path}")]
    FileNotFound { path: PathBuf },

    /// Local input exists but its name does not end in `.pdf`.
    #[error("The provided file does not seem to be a PDF. Please provide a PDF file or URL.")]
    NotAPdfFile { path: PathBuf },

    /// URL input whose path does not end in `.pdf`.
    #[error("The provided URL does not seem to point to a PDF. Please provide a PDF URL.")]
    NotAPdfUrl { url: String },

    /// Local file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP download failed (transport error or non-2xx status).
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The bytes could not be parsed as a PDF, or a page's text could not be extracted.
    #[error("Could not read PDF '{source_name}': {detail}")]
    CorruptPdf { source_name: String, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// Completion endpoint did not answer within the configured bound.
    #[error("LLM API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// Completion endpoint rejected the credential (HTTP 401/403).
    #[error("Authentication error from LLM endpoint (HTTP {status}): {detail}")]
    AuthError { status: u16, detail: String },

    /// Transport failure, non-2xx status or undecodable response body.
    #[error("LLM API error: {message}")]
    LlmApiError {
        status: Option<u16>,
        message: String,
    },

    /// Response decoded but carried no reply text.
    #[error("LLM API returned no content")]
    EmptyReply,

    // ── Reply errors ──────────────────────────────────────────────────────
    /// Reply text is not valid JSON after fence stripping.
    #[error("Error decoding JSON from LLM response: {detail}")]
    MalformedReply { detail: String, raw: String },

    /// Reply is valid JSON but not an object.
    #[error("LLM response is JSON but not an object (got {found})")]
    NotAnObject { found: &'static str, raw: String },

    /// A required key is absent from the reply object.
    #[error("LLM response is missing required key '{key}'")]
    MissingField { key: &'static str },

    /// A key is present with the wrong JSON type.
    #[error("LLM response key '{key}' should be {expected}, got {found}")]
    FieldType {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The existing report could not be loaded.
    #[error("Error reading existing report '{path}': {detail}")]
    ReportReadFailed { path: PathBuf, detail: String },

    /// The report could not be written.
    #[error("Error writing report '{path}': {detail}")]
    ReportWriteFailed { path: PathBuf, detail: String },

    /// Cosmetic formatting could not be applied. Never rolls back the data write.
    #[error("Error applying report styling to '{path}': {detail}")]
    StylingFailed { path: PathBuf, detail: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// The OS default application could not be launched for the report.
    #[error("Error opening '{path}': {detail}")]
    OpenFailed { path: PathBuf, detail: String },

    /// No API credential was supplied.
    #[error("No LLM API key supplied. Set LLM_API_KEY or enter a key when prompted.")]
    MissingCredential,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading from or writing to the interactive console failed.
    #[error("Console I/O failed: {0}")]
    Console(#[source] std::io::Error),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure categories for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Fetch or completion transport error.
    Network,
    /// Local file missing.
    NotFound,
    /// Input not recognised as a PDF by name.
    Format,
    /// PDF text extraction failed.
    Parse,
    /// Completion call failed or returned no content.
    Model,
    /// Reply not valid JSON, or not of the expected shape.
    Schema,
    /// Report read/write error.
    Persistence,
    /// Report formatting error.
    Styling,
    /// Configuration or credential problem.
    Config,
    /// Console or other local environment problem.
    Environment,
}

impl ExtractError {
    /// Category of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::FileNotFound { .. } => FailureKind::NotFound,
            ExtractError::NotAPdfFile { .. } | ExtractError::NotAPdfUrl { .. } => {
                FailureKind::Format
            }
            ExtractError::DownloadFailed { .. } | ExtractError::DownloadTimeout { .. } => {
                FailureKind::Network
            }
            ExtractError::ReadFailed { .. } | ExtractError::CorruptPdf { .. } => FailureKind::Parse,
            ExtractError::ApiTimeout { .. }
            | ExtractError::AuthError { .. }
            | ExtractError::LlmApiError { .. }
            | ExtractError::EmptyReply => FailureKind::Model,
            ExtractError::MalformedReply { .. }
            | ExtractError::NotAnObject { .. }
            | ExtractError::MissingField { .. }
            | ExtractError::FieldType { .. } => FailureKind::Schema,
            ExtractError::ReportReadFailed { .. } | ExtractError::ReportWriteFailed { .. } => {
                FailureKind::Persistence
            }
            ExtractError::StylingFailed { .. } => FailureKind::Styling,
            ExtractError::MissingCredential | ExtractError::InvalidConfig(_) => {
                FailureKind::Config
            }
            ExtractError::OpenFailed { .. }
            | ExtractError::Console(_)
            | ExtractError::Internal(_) => FailureKind::Environment,
        }
    }

    /// The reply text that failed to parse, for manual inspection.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            ExtractError::MalformedReply { raw, .. } | ExtractError::NotAnObject { raw, .. } => {
                Some(raw)
            }
            _ => None,
        }
    }

    /// Rejections happen before any stage runs: the input was never processed.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), FailureKind::NotFound | FailureKind::Format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_path() {
        let e = ExtractError::FileNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert_eq!(e.to_string(), "File not found at missing.pdf");
        assert_eq!(e.kind(), FailureKind::NotFound);
        assert!(e.is_rejection());
    }

    #[test]
    fn not_a_pdf_messages_differ_for_file_and_url() {
        let file = ExtractError::NotAPdfFile {
            path: PathBuf::from("notes.txt"),
        };
        let url = ExtractError::NotAPdfUrl {
            url: "https://example.org/page.html".into(),
        };
        assert_ne!(file.to_string(), url.to_string());
        assert!(url.to_string().contains("URL"));
        assert_eq!(file.kind(), FailureKind::Format);
        assert_eq!(url.kind(), FailureKind::Format);
    }

    #[test]
    fn malformed_reply_keeps_raw_text() {
        let e = ExtractError::MalformedReply {
            detail: "expected value at line 1 column 1".into(),
            raw: "Sorry, I cannot help".into(),
        };
        assert_eq!(e.kind(), FailureKind::Schema);
        assert_eq!(e.raw_reply(), Some("Sorry, I cannot help"));
        assert!(!e.to_string().contains("Sorry"));
    }

    #[test]
    fn timeout_is_model_failure() {
        let e = ExtractError::ApiTimeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
        assert_eq!(e.kind(), FailureKind::Model);
        assert!(!e.is_rejection());
    }

    #[test]
    fn field_type_display() {
        let e = ExtractError::FieldType {
            key: "modifiers_used",
            expected: "a list of strings",
            found: "string",
        };
        let msg = e.to_string();
        assert!(msg.contains("modifiers_used"), "got: {msg}");
        assert!(msg.contains("a list of strings"), "got: {msg}");
    }
}
