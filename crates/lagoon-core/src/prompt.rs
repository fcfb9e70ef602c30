//! Prompt assembly for the one-shot summarization service.
//!
//! Document parsing stays outside the core; callers hand in extracted text
//! and run the returned transcript through the engine.

use crate::types::{Message, Transcript};

/// Instructions prepended to every summarization request. The store schema
/// has no system role, so the instructions ride in the first user message.
const SUMMARY_INSTRUCTIONS: &str = "You are a summarizer for parsed documents. \
Parsed text may be jumbled, incomplete, or badly formatted; make sense of it \
anyway and explain the document in a concise but clear and explanatory \
manner, in English, regardless of the source language.";

/// Build the transcript for summarizing a block of extracted text.
pub fn summary_transcript(context: &str) -> Transcript {
    vec![
        Message::user(SUMMARY_INSTRUCTIONS),
        Message::user(format!(
            "Please summarize the following content:\n\n{context}"
        )),
    ]
}
