//! Input resolution: classify a user-supplied path or URL and fetch its bytes.
//!
//! Classification runs before anything else touches the input, so a typo or
//! a non-PDF link is rejected without a download or a model call. Fetching
//! keeps the whole document in memory: the text extractor works on a byte
//! buffer and nothing is written to disk.

use crate::error::ExtractError;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A validated document location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// HTTP or HTTPS URL ending in `.pdf`.
    Url(String),
    /// Existing local file ending in `.pdf`.
    Local(PathBuf),
}

impl InputSource {
    /// Validate raw operator input.
    ///
    /// Local paths are checked for existence first, then for the `.pdf`
    /// suffix; URLs only for the suffix. The suffix check is case-insensitive.
    pub fn classify(input: &str) -> Result<Self, ExtractError> {
        if is_url(input) {
            if !has_pdf_extension(input) {
                return Err(ExtractError::NotAPdfUrl {
                    url: input.to_string(),
                });
            }
            return Ok(InputSource::Url(input.to_string()));
        }

        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(ExtractError::FileNotFound { path });
        }
        if !has_pdf_extension(input) {
            return Err(ExtractError::NotAPdfFile { path });
        }
        Ok(InputSource::Local(path))
    }

    /// Human-readable name used in logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            InputSource::Url(url) => url.clone(),
            InputSource::Local(path) => path.display().to_string(),
        }
    }

    /// Read or download the document bytes.
    pub async fn fetch(&self, download_timeout_secs: Option<u64>) -> Result<Vec<u8>, ExtractError> {
        match self {
            InputSource::Url(url) => download_url(url, download_timeout_secs).await,
            InputSource::Local(path) => read_local(path).await,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the input names a PDF.
pub fn has_pdf_extension(input: &str) -> bool {
    input.to_lowercase().ends_with(".pdf")
}

async fn read_local(path: &Path) -> Result<Vec<u8>, ExtractError> {
    info!("Reading PDF from local file: {}", path.display());
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Largest buffer reserved up front from a server's `Content-Length`.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Buffer size to reserve for a body of advertised length `hint`.
///
/// The header is the server's claim, not a promise; anything beyond
/// [`MAX_PREALLOCATION`] grows as chunks actually arrive.
fn initial_capacity(hint: Option<u64>) -> usize {
    hint.unwrap_or(0).min(MAX_PREALLOCATION) as usize
}

/// Stream a URL into memory.
async fn download_url(url: &str, timeout_secs: Option<u64>) -> Result<Vec<u8>, ExtractError> {
    info!("Downloading PDF from URL: {}", url);

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|e| ExtractError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let transport_error = |e: reqwest::Error| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs.unwrap_or_default(),
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(transport_error)?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let mut bytes = Vec::with_capacity(initial_capacity(response.content_length()));
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk.map_err(transport_error)?);
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_pdf_extension_is_case_insensitive() {
        assert!(has_pdf_extension("policy.pdf"));
        assert!(has_pdf_extension("POLICY.PDF"));
        assert!(has_pdf_extension("https://example.com/a/Policy.Pdf"));
        assert!(!has_pdf_extension("policy.pdf.txt"));
        assert!(!has_pdf_extension("https://example.com/policy"));
    }

    #[test]
    fn missing_local_file_is_not_found() {
        let err = InputSource::classify("definitely-missing-file.pdf").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn existing_non_pdf_is_rejected_as_format() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "not a pdf").unwrap();
        let err = InputSource::classify(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdfFile { .. }));
    }

    #[test]
    fn url_without_pdf_suffix_is_rejected() {
        let err = InputSource::classify("https://example.com/policy.html").unwrap_err();
        assert!(matches!(err, ExtractError::NotAPdfUrl { .. }));
    }

    #[test]
    fn url_is_not_checked_for_existence() {
        let source = InputSource::classify("https://example.com/policy.PDF").unwrap();
        assert_eq!(source, InputSource::Url("https://example.com/policy.PDF".into()));
    }

    #[test]
    fn advertised_length_is_clamped() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(4096)), 4096);
        assert_eq!(initial_capacity(Some(100_000_000_000_000)), MAX_PREALLOCATION as usize);
    }

    #[tokio::test]
    async fn reads_local_bytes() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.5 fake").unwrap();
        let source = InputSource::classify(file.path().to_str().unwrap()).unwrap();
        let bytes = source.fetch(None).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.5 fake");
    }
}
