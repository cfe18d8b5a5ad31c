//! Serde data model for the declarative extraction pattern language.
//!
//! A pattern set maps a *category* (one family of target pages, e.g. a
//! specific search engine) to a [`Rule`] with three optional sections:
//!
//! - `preprocess`: prune directives removing noise elements before extraction,
//! - `input`: CSS-selector-keyed groups of field rules (`first` matches one
//!   root element, `all` matches every root element),
//! - `output`: per-action message schemas combining extracted fields with
//!   the job context.
//!
//! The `{first|all}` and `{select|firstMatch}` dichotomies are modeled as
//! tagged enums so structurally invalid sections fail at snapshot parse.
//! Transform chains stay raw JSON and are validated when a chain actually
//! runs, so a category referencing a future primitive never produces
//! partial output.
//!
//! All maps are insertion-ordered: actions are emitted, and payload fields
//! placed, in declaration order.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field rules keyed by output-field name, in declaration order.
pub type FieldMap = IndexMap<String, SelectorDef>;

/// The full pattern set: category → rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet {
    pub categories: IndexMap<String, Rule>,
}

impl PatternSet {
    /// Parse a pattern set from its JSON wire form.
    ///
    /// Structural violations (a prune directive or input group missing both
    /// `first` and `all`, a selector definition that is neither a single
    /// rule nor a `firstMatch` list) are permanent errors.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::Pattern(err.to_string()))
    }

    /// Look up the rule for a category, if one is defined.
    pub fn get(&self, category: &str) -> Option<&Rule> {
        self.categories.get(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Extraction rule for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Elements to remove from the document before any input is evaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preprocess: Vec<PruneDirective>,
    /// Input groups keyed by their root CSS selector.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input: IndexMap<String, InputGroup>,
    /// Output schemas keyed by action name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub output: IndexMap<String, OutputSchema>,
}

/// A prune directive: remove the first match of a selector, or every match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PruneDirective {
    #[serde(rename = "first")]
    First(String),
    #[serde(rename = "all")]
    All(String),
}

/// An input group: field rules evaluated against one root match (`first`)
/// or against every root match in document order (`all`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputGroup {
    #[serde(rename = "first")]
    First(FieldMap),
    #[serde(rename = "all")]
    All(FieldMap),
}

impl InputGroup {
    /// The field rules, regardless of group kind.
    pub fn fields(&self) -> &FieldMap {
        match self {
            InputGroup::First(fields) | InputGroup::All(fields) => fields,
        }
    }
}

/// How one output field is selected from the DOM.
///
/// Either a single rule, or an ordered list of alternatives where the first
/// alternative whose selector yields a value wins (`firstMatch`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorDef {
    FirstMatch {
        #[serde(rename = "firstMatch")]
        first_match: Vec<SingleRule>,
    },
    Single(SingleRule),
}

/// One selector/attribute/transform rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleRule {
    /// CSS selector scoped to the group's root element. When omitted, the
    /// root element itself is the target. Required inside `firstMatch`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    /// `textContent`, `href`, or any DOM attribute name.
    pub attr: String,
    /// Transform chain, kept as raw JSON and validated at evaluation time.
    /// Shape: a list of steps, each step a list `[name, ...args]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
}

/// Message schema for one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSchema {
    /// Payload fields, placed in this order.
    pub fields: Vec<OutputField>,
    /// Drop this action when any of these other actions was also emitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub omit_if_exists_any: Vec<String>,
    /// Opaque tag forwarded on the message; the core infers nothing from it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicate_by: Option<String>,
}

/// One entry in an output schema's field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputField {
    /// Payload key. For sourced fields this must match a field name declared
    /// under the source input group; for context fields it names the context
    /// entry (`q`, `qurl`, `ctry`).
    pub key: String,
    /// Input-group key this field is drawn from. Absent = context field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// For array-merged fields: which keys an entry must carry to survive.
    /// Defaults to every field declared under the source input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_keys: Option<Vec<String>>,
    /// Absent non-optional values disqualify the whole action.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}
