//! Configuration for policy extraction.
//!
//! Everything the pipeline needs that is not the document itself lives in
//! [`ExtractorConfig`]: the credential, the completion endpoint, the report
//! path and the session behaviour. It is built once at startup and passed
//! by reference into every stage, so tests can point each stage at a temp
//! directory or a local mock server.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Environment variable consulted for the API credential.
pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default report file name, relative to the working directory.
pub const DEFAULT_REPORT_PATH: &str = "policy_data.xlsx";

/// Configuration for extracting policies and maintaining the report.
///
/// # Example
/// ```rust
/// use policy_extract::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .api_key("sk-test")
///     .model("gpt-4o-mini")
///     .report_path("reports/policies.xlsx")
///     .build()
///     .unwrap();
/// assert_eq!(config.api_timeout_secs, 120);
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Bearer credential for the completion endpoint.
    pub api_key: Option<String>,

    /// Model identifier sent with every request. Default: `gpt-4o`.
    pub model: String,

    /// Chat-completions URL. Default: the OpenAI endpoint.
    pub endpoint: String,

    /// Bound on a single completion call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Bound on a PDF download, in seconds. Default: none.
    pub download_timeout_secs: Option<u64>,

    /// Report workbook path. Default: `policy_data.xlsx`.
    pub report_path: PathBuf,

    /// Input that ends the document loop, compared case-insensitively. Default: `q`.
    pub quit_sentinel: String,

    /// Ask whether to open the report after each successful write. Default: true.
    pub offer_open: bool,

    /// What to do when an existing report cannot be loaded. Default: [`LoadFailurePolicy::ReplaceTable`].
    pub on_load_failure: LoadFailurePolicy,

    /// Number of characters of the raw reply included in the log preview. Default: 500.
    pub reply_preview_chars: usize,

    /// Optional stage-level progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_timeout_secs: 120,
            download_timeout_secs: None,
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            quit_sentinel: "q".to_string(),
            offer_open: true,
            on_load_failure: LoadFailurePolicy::default(),
            reply_preview_chars: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("report_path", &self.report_path)
            .field("quit_sentinel", &self.quit_sentinel)
            .field("offer_open", &self.offer_open)
            .field("on_load_failure", &self.on_load_failure)
            .field("reply_preview_chars", &self.reply_preview_chars)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when `input` is the quit sentinel.
    pub fn is_quit(&self, input: &str) -> bool {
        input.trim().eq_ignore_ascii_case(&self.quit_sentinel)
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = Some(secs);
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = path.into();
        self
    }

    pub fn quit_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.config.quit_sentinel = sentinel.into();
        self
    }

    pub fn offer_open(mut self, v: bool) -> Self {
        self.config.offer_open = v;
        self
    }

    pub fn on_load_failure(mut self, policy: LoadFailurePolicy) -> Self {
        self.config.on_load_failure = policy;
        self
    }

    pub fn reply_preview_chars(mut self, n: usize) -> Self {
        self.config.reply_preview_chars = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ExtractError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == Some(0) {
            return Err(ExtractError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.quit_sentinel.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "quit sentinel must not be empty".into(),
            ));
        }
        if c.report_path.as_os_str().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "report path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Behaviour when the existing report cannot be loaded before an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadFailurePolicy {
    /// Write the new row as the whole table. Rows in the unreadable file are lost. (default)
    #[default]
    ReplaceTable,
    /// Leave the existing file untouched and fail the append.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractorConfig::default();
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.api_timeout_secs, 120);
        assert_eq!(c.download_timeout_secs, None);
        assert_eq!(c.report_path, PathBuf::from("policy_data.xlsx"));
        assert_eq!(c.on_load_failure, LoadFailurePolicy::ReplaceTable);
        assert!(c.offer_open);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ExtractorConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ExtractorConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        assert!(ExtractorConfig::builder()
            .endpoint("ftp://example.org")
            .build()
            .is_err());
    }

    #[test]
    fn quit_is_case_insensitive() {
        let c = ExtractorConfig::default();
        assert!(c.is_quit("q"));
        assert!(c.is_quit("Q"));
        assert!(c.is_quit(" q \n"));
        assert!(!c.is_quit("quit"));
    }
}
