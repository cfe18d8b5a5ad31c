//! Pattern-driven extraction of telemetry messages from a fetched document.
//!
//! This is the synchronous core of the subsystem. Given raw HTML, one
//! consistent pattern snapshot, and the job context, it prunes the
//! document, evaluates the category's input groups, assembles output
//! messages, and applies the redundancy filter. The parsed document lives
//! only for the duration of one call.

pub mod assembler;
pub mod evaluator;
pub mod preprocess;
pub mod selector;
pub mod transforms;

use crate::error::{Error, Result};
use crate::messages::Message;
use crate::patterns::schema::PatternSet;
use scraper::Html;
use url::Url;

/// Per-job context merged into message payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionContext {
    /// The search query as typed by the user.
    pub query: String,
    /// The URL that was refetched.
    pub url: String,
    /// Two-letter country code, or `"--"` when unknown.
    pub country: String,
}

impl ExtractionContext {
    /// Resolve a context field by its payload key.
    pub fn value_for(&self, key: &str) -> Option<&str> {
        match key {
            "q" => Some(&self.query),
            "qurl" => Some(&self.url),
            "ctry" => Some(&self.country),
            _ => None,
        }
    }
}

/// Extract all messages for `category` from a fetched document.
///
/// An unknown category yields no messages; a malformed rule yields a
/// permanent error. Deterministic for fixed inputs except for the
/// anti-duplicates nonce drawn per message.
pub fn extract_messages(
    html: &str,
    patterns: &PatternSet,
    category: &str,
    context: &ExtractionContext,
) -> Result<Vec<Message>> {
    let rule = match patterns.get(category) {
        Some(rule) => rule,
        None => return Ok(Vec::new()),
    };

    let base = Url::parse(&context.url)
        .map_err(|err| Error::Parse(format!("invalid document url {:?}: {err}", context.url)))?;

    let mut doc = Html::parse_document(html);
    preprocess::apply_prune(&mut doc, &rule.preprocess)?;
    let inputs = evaluator::evaluate_inputs(&doc, rule, &base)?;
    drop(doc);

    let messages = assembler::assemble_messages(rule, &inputs, context)?;
    Ok(assembler::filter_redundant(messages, rule))
}
