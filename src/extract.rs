//! Single-document extraction entry points.
//!
//! [`extract_policy`] runs every stage for one document, from fetching the
//! bytes to validating the reply, and returns the record. It never touches
//! the report; the caller decides whether and where to append.
//!
//! Each stage is reported to the configured progress callback. The first
//! failing stage ends the document: nothing is retried.

use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::pipeline::input::InputSource;
use crate::pipeline::llm::CompletionClient;
use crate::pipeline::{pdf_text, response};
use crate::progress::{observe, Stage};
use crate::prompts::build_prompt;
use crate::record::PolicyRecord;
use std::time::Instant;
use tracing::info;

/// Extract policy metadata from a local PDF or a PDF URL.
///
/// # Errors
/// Returns the error of the first stage that fails: fetch, text
/// extraction, completion, or reply validation.
pub async fn extract_policy(
    source: &InputSource,
    client: &dyn CompletionClient,
    config: &ExtractorConfig,
) -> Result<PolicyRecord, ExtractError> {
    let start = Instant::now();
    let name = source.display_name();
    info!("Starting extraction: {}", name);

    let bytes = observe(
        config.progress_callback.as_ref(),
        Stage::Fetch,
        source.fetch(config.download_timeout_secs),
    )
    .await?;

    let record = extract_policy_from_bytes(bytes, &name, client, config).await?;
    info!("Extracted policy data from {} in {:?}", name, start.elapsed());
    Ok(record)
}

/// Extract policy metadata from PDF bytes already in memory.
///
/// `source_name` only labels logs and errors.
pub async fn extract_policy_from_bytes(
    bytes: Vec<u8>,
    source_name: &str,
    client: &dyn CompletionClient,
    config: &ExtractorConfig,
) -> Result<PolicyRecord, ExtractError> {
    let cb = config.progress_callback.as_ref();

    let document = observe(cb, Stage::ReadPdf, pdf_text::extract_text(bytes, source_name)).await?;
    info!(
        "Extracted {} characters from {} pages",
        document.text.chars().count(),
        document.page_count
    );

    let prompt = build_prompt(&document.text);
    let reply = observe(cb, Stage::Complete, client.complete(&prompt)).await?;
    info!(
        "LLM raw response (first {} chars): {}",
        config.reply_preview_chars,
        preview(&reply, config.reply_preview_chars)
    );

    observe(cb, Stage::Parse, async {
        let payload = response::parse_reply(&reply)?;
        PolicyRecord::from_payload(&payload)
    })
    .await
}

/// First `max_chars` characters of `text`.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdf_text::tests::fixture;
    use crate::progress::ExtractionProgressCallback;
    use futures::future::BoxFuture;
    use std::sync::{Arc, Mutex};

    const REPLY: &str = r#"```json
{
  "payer_name": "Acme",
  "policy_name": "Anesthesia Services",
  "policy_number": "AN1234",
  "policy_type": "Anesthesia",
  "approval_date": "11/10/23",
  "effective_date": "1/1/24",
  "brief_summary": "Covers anesthesia.",
  "covered_hcpcs_codes": ["85", "123"],
  "non_covered_hcpcs_codes": [],
  "modifiers_used": ["AA"],
  "service_summary": "General anesthesia.",
  "reimbursement_detail": "ASA units.",
  "non_reimbursement_detail": "Cosmetic.",
  "notes": "Prior auth."
}
```"#;

    /// Returns a canned reply and remembers every prompt it was sent.
    struct ScriptedClient {
        reply: Result<String, fn() -> ExtractError>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> ExtractError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ExtractError>> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let result = match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct StageLog(Mutex<Vec<(Stage, bool)>>);

    impl ExtractionProgressCallback for StageLog {
        fn on_stage_complete(&self, stage: Stage) {
            self.0.lock().unwrap().push((stage, true));
        }

        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.0.lock().unwrap().push((stage, false));
        }
    }

    #[tokio::test]
    async fn extracts_record_and_embeds_text_in_prompt() {
        let client = ScriptedClient::replying(REPLY);
        let config = ExtractorConfig::default();
        let bytes = fixture(&[Some("Policy AN1234 text")]);

        let record = extract_policy_from_bytes(bytes, "fixture.pdf", &client, &config)
            .await
            .unwrap();
        assert_eq!(record.policy_number, "AN1234");
        assert_eq!(record.covered_hcpcs_codes, vec!["85", "123"]);
        assert!(record.non_covered_hcpcs_codes.is_empty());

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Act as a policy advisor."));
        assert!(prompts[0].contains("Policy AN1234 text"));
    }

    #[tokio::test]
    async fn corrupt_pdf_never_reaches_the_model() {
        let client = ScriptedClient::replying(REPLY);
        let config = ExtractorConfig::default();
        let err = extract_policy_from_bytes(b"junk".to_vec(), "junk.pdf", &client, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::CorruptPdf { .. }));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_reported_at_complete_stage() {
        let log = Arc::new(StageLog::default());
        let config = ExtractorConfig::builder()
            .progress_callback(log.clone())
            .build()
            .unwrap();
        let client = ScriptedClient::failing(|| ExtractError::ApiTimeout { secs: 120 });

        let err = extract_policy_from_bytes(fixture(&[Some("x")]), "f.pdf", &client, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ApiTimeout { secs: 120 }));
        assert_eq!(
            *log.0.lock().unwrap(),
            vec![(Stage::ReadPdf, true), (Stage::Complete, false)]
        );
    }

    #[tokio::test]
    async fn incomplete_reply_is_a_schema_failure() {
        let client = ScriptedClient::replying("{\"payer_name\": \"Acme\"}");
        let config = ExtractorConfig::default();
        let err = extract_policy_from_bytes(fixture(&[Some("x")]), "f.pdf", &client, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingField { key: "policy_name" }));
    }

    #[tokio::test]
    async fn missing_local_file_fails_at_fetch() {
        let client = ScriptedClient::replying(REPLY);
        let config = ExtractorConfig::default();
        let source = InputSource::Local("no/such/policy.pdf".into());
        let err = extract_policy(&source, &client, &config).await.unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("abc", 10), "abc");
        assert_eq!(preview("abc", 0), "");
    }
}
