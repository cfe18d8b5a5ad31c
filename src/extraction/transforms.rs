//! Transform registry: named pure functions over extracted scalars.
//!
//! A transform chain is a list of steps `[name, ...args]` applied left to
//! right. A null input short-circuits the whole chain to null before any
//! registry lookup. An unknown name is a permanent error at evaluation
//! time, never at rule load, so patterns referencing future primitives
//! produce no partial output.

use crate::error::{Error, Result};
use serde_json::Value;
use url::Url;

/// A pure scalar transform: `(value, args) → value-or-null`.
pub type TransformFn = fn(&str, &[Value]) -> Result<Option<String>>;

/// Resolve a transform by name.
pub fn lookup(name: &str) -> Result<TransformFn> {
    match name {
        "queryParam" => Ok(query_param),
        "split" => Ok(split),
        "trySplit" => Ok(try_split),
        "trim" => Ok(trim),
        "filterExact" => Ok(filter_exact),
        "json" => Ok(json_field),
        other => Err(Error::UnknownTransform(other.to_string())),
    }
}

/// Run a transform chain over a value.
///
/// `steps` is the raw JSON carried by the pattern: it must be a list of
/// steps, each step a list whose head is a transform name. Shape violations
/// are permanent errors. Once the running value becomes null it stays null,
/// but every remaining step name is still resolved so bad patterns fail
/// loudly.
pub fn run_transforms(value: Option<String>, steps: Option<&Value>) -> Result<Option<String>> {
    let steps = match steps {
        Some(steps) => steps
            .as_array()
            .ok_or_else(|| Error::Pattern("transform must be a list of steps".into()))?,
        None => return Ok(value),
    };

    if value.is_none() {
        return Ok(None);
    }

    let mut current = value;
    for step in steps {
        let step = step
            .as_array()
            .ok_or_else(|| Error::Pattern("transform step must be a list".into()))?;
        let name = step
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Pattern("transform step must start with a name".into()))?;
        let transform = lookup(name)?;
        current = match current {
            Some(value) => transform(&value, &step[1..])?,
            None => None,
        };
    }
    Ok(current)
}

// ── Built-in transforms ──────────────────────────────────────────────────────

/// `["queryParam", name]` — parse the value as a URL and return the named
/// query parameter, decoded. Null when the value is not an absolute URL or
/// the parameter is missing.
fn query_param(value: &str, args: &[Value]) -> Result<Option<String>> {
    let param = str_arg(args, 0, "queryParam")?;
    let url = match Url::parse(value) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };
    Ok(url
        .query_pairs()
        .find(|(key, _)| key.as_ref() == param)
        .map(|(_, value)| value.into_owned()))
}

/// `["split", on, index]` — split and take the indexed part, null when the
/// index is out of range.
fn split(value: &str, args: &[Value]) -> Result<Option<String>> {
    let on = str_arg(args, 0, "split")?;
    let index = index_arg(args, 1, "split")?;
    Ok(value.split(on).nth(index).map(str::to_string))
}

/// `["trySplit", on, index]` — like `split`, but falls back to the original
/// value when the indexed part is missing or empty.
fn try_split(value: &str, args: &[Value]) -> Result<Option<String>> {
    let on = str_arg(args, 0, "trySplit")?;
    let index = index_arg(args, 1, "trySplit")?;
    let part = value.split(on).nth(index).filter(|part| !part.is_empty());
    Ok(Some(
        part.map(str::to_string).unwrap_or_else(|| value.to_string()),
    ))
}

/// `["trim"]` — strip surrounding whitespace.
fn trim(value: &str, _args: &[Value]) -> Result<Option<String>> {
    Ok(Some(value.trim().to_string()))
}

/// `["filterExact", [allowed...]]` — keep the value only when it appears in
/// the allow list.
fn filter_exact(value: &str, args: &[Value]) -> Result<Option<String>> {
    let allowed = args
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Pattern("filterExact expects a list argument".into()))?;
    if allowed.iter().any(|entry| entry.as_str() == Some(value)) {
        Ok(Some(value.to_string()))
    } else {
        Ok(None)
    }
}

/// `["json", path]` — parse the value as JSON and return the scalar at the
/// dotted path. Null on parse failure or non-scalar leaves.
fn json_field(value: &str, args: &[Value]) -> Result<Option<String>> {
    let path = str_arg(args, 0, "json")?;
    let parsed: Value = match serde_json::from_str(value) {
        Ok(parsed) => parsed,
        Err(_) => return Ok(None),
    };
    let mut node = &parsed;
    for segment in path.split('.') {
        node = match node.get(segment) {
            Some(next) => next,
            None => return Ok(None),
        };
    }
    Ok(match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn str_arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Pattern(format!("{name} expects a string argument {index}")))
}

fn index_arg(args: &[Value], index: usize, name: &str) -> Result<usize> {
    args.get(index)
        .and_then(Value::as_u64)
        .map(|value| value as usize)
        .ok_or_else(|| Error::Pattern(format!("{name} expects an index argument {index}")))
}
