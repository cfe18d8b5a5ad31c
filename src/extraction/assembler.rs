//! Message assembly: combine extracted values with the job context.
//!
//! Every action in the rule's `output` section is assembled independently,
//! in declaration order. Presence rules decide whether a field is placed,
//! skipped, or disqualifies the whole action:
//!
//! - context fields (no `source`) are placed when present, silently skipped
//!   otherwise, and never disqualify an action;
//! - single-value fields disqualify the action when absent and
//!   non-optional, and are placed as null when absent but optional;
//! - array-merged fields zip the parallel columns of an `all` input, keep
//!   entries carrying every required key, and disqualify the action when
//!   the result is empty and the field is non-optional. The surviving
//!   entries are emitted as a positional object keyed `"0"`, `"1"`, … for
//!   wire compatibility with the telemetry consumer.

use crate::error::{Error, Result};
use crate::extraction::evaluator::{ExtractedInputs, GroupValues};
use crate::extraction::ExtractionContext;
use crate::messages::Message;
use crate::patterns::schema::Rule;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A value is present iff it is neither null nor the empty string.
fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}

/// Assemble one message per eligible action.
pub fn assemble_messages(
    rule: &Rule,
    inputs: &ExtractedInputs,
    context: &ExtractionContext,
) -> Result<Vec<Message>> {
    let mut messages = Vec::new();

    'actions: for (action, schema) in &rule.output {
        let mut payload = Map::new();

        for field in &schema.fields {
            let source = match &field.source {
                None => {
                    if let Some(value) = context.value_for(&field.key) {
                        if !value.is_empty() {
                            payload.insert(field.key.clone(), Value::String(value.to_string()));
                        }
                    }
                    continue;
                }
                Some(source) => source,
            };

            let group = inputs.get(source).ok_or_else(|| {
                Error::Pattern(format!(
                    "output field {:?} references unknown input {source:?}",
                    field.key
                ))
            })?;

            match group {
                GroupValues::Single(values) => {
                    let value = values.get(&field.key).cloned().flatten();
                    if !is_present(value.as_deref()) && !field.optional {
                        continue 'actions;
                    }
                    payload.insert(
                        field.key.clone(),
                        value.map(Value::String).unwrap_or(Value::Null),
                    );
                }
                GroupValues::All { fields, len } => {
                    let entries = merge_rows(fields, *len, field.required_keys.as_deref());
                    if entries.is_empty() && !field.optional {
                        continue 'actions;
                    }
                    let mut positional = Map::new();
                    for (index, entry) in entries.into_iter().enumerate() {
                        positional.insert(index.to_string(), Value::Object(entry));
                    }
                    payload.insert(field.key.clone(), Value::Object(positional));
                }
            }
        }

        messages.push(Message::new(
            action.clone(),
            payload,
            schema.deduplicate_by.clone(),
        ));
    }

    Ok(messages)
}

/// Zip the parallel columns of an `all` input into per-root entries,
/// keeping only entries where every required key is present.
fn merge_rows(
    fields: &IndexMap<String, Vec<Option<String>>>,
    len: usize,
    required_keys: Option<&[String]>,
) -> Vec<Map<String, Value>> {
    let required: Vec<&str> = match required_keys {
        Some(keys) => keys.iter().map(String::as_str).collect(),
        None => fields.keys().map(String::as_str).collect(),
    };

    let mut rows = Vec::new();
    for index in 0..len {
        let value_at = |key: &str| {
            fields
                .get(key)
                .and_then(|column| column.get(index))
                .and_then(|value| value.as_deref())
        };
        if !required.iter().all(|key| is_present(value_at(key))) {
            continue;
        }

        let mut row = Map::new();
        for (key, column) in fields {
            if let Some(Some(value)) = column.get(index) {
                if !value.is_empty() {
                    row.insert(key.clone(), Value::String(value.clone()));
                }
            }
        }
        rows.push(row);
    }
    rows
}

/// Drop messages whose `omitIfExistsAny` names another emitted action.
///
/// One pass against the pre-filter action set: dropping a message never
/// resurrects another, and a message is not dropped for merely listing its
/// own action.
pub fn filter_redundant(messages: Vec<Message>, rule: &Rule) -> Vec<Message> {
    let keep: Vec<bool> = {
        let emitted: HashSet<&str> = messages
            .iter()
            .map(|message| message.body.action.as_str())
            .collect();
        messages
            .iter()
            .map(|message| {
                let action = message.body.action.as_str();
                rule.output.get(action).map_or(true, |schema| {
                    !schema
                        .omit_if_exists_any
                        .iter()
                        .any(|other| other != action && emitted.contains(other.as_str()))
                })
            })
            .collect()
    };

    messages
        .into_iter()
        .zip(keep)
        .filter_map(|(message, keep)| keep.then_some(message))
        .collect()
}
