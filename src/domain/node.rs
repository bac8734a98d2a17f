//! Task tree document model.
//!
//! A node is an open JSON object. The handful of fields the assigner reads or writes get
//! typed accessors; everything else lives in `extra` and round-trips untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

/// Explicit total budget owned by a node (in `variables`).
pub const TIME: &str = "time";
/// Per-leaf fallback an ancestor offers to leaves without a closer budget owner.
pub const DEFAULT_TIME: &str = "default_time";
/// Author/computed result (in `initialValues`); a leading `-` marks a cancelled leaf.
pub const RESULT: &str = "result";
/// Computed estimate written by the assigner (in `initialValues`).
pub const ESTIMATED_TIME: &str = "estimated_time";

/// Top-level fields earlier tools left behind while assigning. Never valid in output.
pub const TRANSIENT_FIELDS: [&str; 3] = ["parent", "affectNodes", "exclusionTime"];

const LABEL_FIELDS: [&str; 4] = ["name", "title", "label", "text"];

/// One element of a task tree (sheet, section, row, task, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Ordered children; empty means leaf
    #[serde(default)]
    pub children: Vec<Node>,
    /// Author-supplied fields such as `time` and `default_time`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Map<String, Value>>,
    /// Author/computed fields such as `result` and `estimated_time`
    #[serde(
        rename = "initialValues",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_values: Option<Map<String, Value>>,
    /// Every other field of the node
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Interpret a field as an integer.
///
/// Accepts JSON integers and strings holding a signed integer (surrounding whitespace
/// allowed). Anything else is treated as absent.
pub fn parse_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

impl Node {
    /// Parse a task tree document.
    ///
    /// The root must be an object carrying a `children` array.
    pub fn parse(content: &str) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_str(content)?;
        let Some(object) = value.as_object() else {
            return Err(DomainError::InvalidDocument(
                "root is not an object".to_string(),
            ));
        };
        match object.get("children") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(DomainError::InvalidDocument(
                    "root `children` is not an array".to_string(),
                ))
            }
            None => {
                return Err(DomainError::InvalidDocument(
                    "root has no `children`".to_string(),
                ))
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back into the document shape.
    pub fn to_json(&self, pretty: bool) -> Result<String, DomainError> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn variable(&self, name: &str) -> Option<i64> {
        self.variables
            .as_ref()
            .and_then(|vars| vars.get(name))
            .and_then(parse_number)
    }

    /// Explicit budget of this node, if it parses.
    pub fn time(&self) -> Option<i64> {
        self.variable(TIME)
    }

    /// Fallback per-leaf time offered to descendants, if it parses.
    pub fn default_time(&self) -> Option<i64> {
        self.variable(DEFAULT_TIME)
    }

    pub fn result(&self) -> Option<&str> {
        self.initial_values
            .as_ref()
            .and_then(|vals| vals.get(RESULT))
            .and_then(Value::as_str)
    }

    /// A `result` starting with `-` marks the node as cancelled.
    pub fn is_excluded(&self) -> bool {
        self.result().is_some_and(|r| r.starts_with('-'))
    }

    pub fn estimated_time(&self) -> Option<i64> {
        self.initial_values
            .as_ref()
            .and_then(|vals| vals.get(ESTIMATED_TIME))
            .and_then(Value::as_i64)
    }

    /// Write the computed estimate, creating `initialValues` when absent.
    pub fn set_estimated_time(&mut self, minutes: i64) {
        self.initial_values
            .get_or_insert_with(Map::new)
            .insert(ESTIMATED_TIME.to_string(), Value::from(minutes));
    }

    /// Drop the raw time inputs and any transient fields a previous run left behind.
    pub fn strip_run_fields(&mut self) {
        if let Some(vars) = self.variables.as_mut() {
            vars.shift_remove(TIME);
            vars.shift_remove(DEFAULT_TIME);
        }
        for field in TRANSIENT_FIELDS {
            self.extra.shift_remove(field);
        }
    }

    /// Human readable label for tree previews.
    pub fn label(&self) -> Option<&str> {
        LABEL_FIELDS
            .iter()
            .find_map(|field| self.extra.get(*field).and_then(Value::as_str))
    }
}
