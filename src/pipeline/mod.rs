//! Pipeline stages for policy extraction.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own with fixture bytes, canned replies or a temp directory.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf_text ──▶ (prompt) ──▶ llm ──▶ response ──▶ report
//! (bytes)    (lopdf)                  (HTTP)   (JSON)      (xlsx)
//! ```
//!
//! 1. [`input`]: classify the user-supplied path or URL and fetch its bytes
//! 2. [`pdf_text`]: concatenate the text of every page in order
//! 3. [`llm`]: one chat-completion call; the only stage talking to the model
//! 4. [`response`]: strip stray markdown fences and parse the reply as JSON
//! 5. [`report`]: append the record to the workbook and restyle it
//!
//! The prompt between stages 2 and 3 is built by [`crate::prompts`].

pub mod input;
pub mod llm;
pub mod pdf_text;
pub mod report;
pub mod response;
