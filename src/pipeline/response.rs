//! Reply sanitising: strip markdown fences and parse the JSON object.
//!
//! The prompt asks for a bare JSON object and the request sets the
//! JSON-object response format, yet replies still sometimes arrive wrapped
//! in a ```` ```json ```` block, or with only one half of the fence. The
//! stripping rules:
//!
//! | Opening ```` ```json ```` | Closing ```` ``` ```` | Kept |
//! |---|---|---|
//! | yes | yes, after it | text strictly between them, trimmed |
//! | yes | no | text after the opening marker, trimmed |
//! | no | yes | text before the last closing marker, trimmed |
//! | no | no | the reply unchanged |
//!
//! The closing marker is the *last* ```` ``` ```` in the reply that is not
//! part of the opening marker itself.

use crate::error::ExtractError;
use crate::record::json_type_name;
use serde_json::{Map, Value};
use tracing::debug;

const OPENING_FENCE: &str = "```json";
const CLOSING_FENCE: &str = "```";

/// Which fence markers were found in a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceShape {
    Paired,
    OpeningOnly,
    ClosingOnly,
    Unfenced,
}

/// Locate the fences in `reply`.
fn locate_fences(reply: &str) -> (Option<usize>, Option<usize>) {
    let opening = reply.find(OPENING_FENCE);
    let closing = reply
        .rfind(CLOSING_FENCE)
        .filter(|&pos| opening.map_or(true, |open| pos > open));
    (opening, closing)
}

/// Strip fences from `reply`, reporting which case applied.
pub fn strip_fences(reply: &str) -> (FenceShape, &str) {
    match locate_fences(reply) {
        (Some(open), Some(close)) => (
            FenceShape::Paired,
            reply[open + OPENING_FENCE.len()..close].trim(),
        ),
        (Some(open), None) => (
            FenceShape::OpeningOnly,
            reply[open + OPENING_FENCE.len()..].trim(),
        ),
        (None, Some(close)) => (FenceShape::ClosingOnly, reply[..close].trim()),
        (None, None) => (FenceShape::Unfenced, reply),
    }
}

/// Strip fences and parse the remainder as a JSON object.
///
/// On failure the error carries the stripped text for manual inspection.
pub fn parse_reply(reply: &str) -> Result<Map<String, Value>, ExtractError> {
    let (shape, body) = strip_fences(reply);
    match shape {
        FenceShape::Paired => debug!("Stripped markdown code block fences from LLM response"),
        FenceShape::OpeningOnly => debug!("Stripped only the opening code block fence"),
        FenceShape::ClosingOnly => debug!("Stripped only the closing code block fence"),
        FenceShape::Unfenced => debug!("No markdown code block fences found, parsing as is"),
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ExtractError::MalformedReply {
        detail: e.to_string(),
        raw: body.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::NotAnObject {
            found: json_type_name(&other),
            raw: body.to_string(),
        }),
    }
}
