//! Rule evaluation: walk a rule's `input` section into the extraction map.
//!
//! Each input group is keyed by its root CSS selector. A `first` group
//! evaluates its fields against the first root match (no match leaves the
//! fields undefined); an `all` group evaluates them against every root
//! match, producing per-field arrays that stay parallel by construction.

use crate::error::{Error, Result};
use crate::extraction::selector::{parse_selector, run_selector};
use crate::extraction::transforms::run_transforms;
use crate::patterns::schema::{InputGroup, Rule, SelectorDef};
use indexmap::IndexMap;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use url::Url;

/// Values extracted for one input group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupValues {
    /// `first` group: one value per field. A missing key means the group's
    /// root selector had no match.
    Single(HashMap<String, Option<String>>),
    /// `all` group: one column per field, every column `len` entries long.
    All {
        fields: IndexMap<String, Vec<Option<String>>>,
        len: usize,
    },
}

/// The two-level extraction map: input-group key → field values.
pub type ExtractedInputs = HashMap<String, GroupValues>;

/// Evaluate every input group of `rule` against the (already pruned)
/// document.
pub fn evaluate_inputs(doc: &Html, rule: &Rule, base: &Url) -> Result<ExtractedInputs> {
    let mut extracted = ExtractedInputs::new();

    for (root_selector, group) in &rule.input {
        let parsed = parse_selector(root_selector)?;
        let values = match group {
            InputGroup::First(field_map) => {
                let mut values = HashMap::new();
                if let Some(item) = doc.select(&parsed).next() {
                    for (key, def) in field_map {
                        values.insert(key.clone(), evaluate_def(item, def, base)?);
                    }
                }
                GroupValues::Single(values)
            }
            InputGroup::All(field_map) => {
                let roots: Vec<ElementRef<'_>> = doc.select(&parsed).collect();
                let mut fields = IndexMap::new();
                for (key, def) in field_map {
                    let mut column = Vec::with_capacity(roots.len());
                    for item in &roots {
                        column.push(evaluate_def(*item, def, base)?);
                    }
                    fields.insert(key.clone(), column);
                }
                GroupValues::All {
                    fields,
                    len: roots.len(),
                }
            }
        };
        extracted.insert(root_selector.clone(), values);
    }

    Ok(extracted)
}

/// Evaluate one field rule against a root element.
///
/// `firstMatch` alternatives are tried in order; the first non-null raw
/// selector result wins and only that alternative's transform chain runs.
fn evaluate_def(root: ElementRef<'_>, def: &SelectorDef, base: &Url) -> Result<Option<String>> {
    match def {
        SelectorDef::Single(rule) => {
            let raw = run_selector(root, rule.select.as_deref(), &rule.attr, base)?;
            run_transforms(raw, rule.transform.as_ref())
        }
        SelectorDef::FirstMatch { first_match } => {
            for alternative in first_match {
                let select = alternative.select.as_deref().ok_or_else(|| {
                    Error::Pattern("firstMatch alternative requires a select".into())
                })?;
                let raw = run_selector(root, Some(select), &alternative.attr, base)?;
                if raw.is_some() {
                    return run_transforms(raw, alternative.transform.as_ref());
                }
            }
            Ok(None)
        }
    }
}
