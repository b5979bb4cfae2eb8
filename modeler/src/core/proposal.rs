//! Edit proposal grammar.
//!
//! An oracle proposal is either a stop marker or one edit verb with an exact
//! required-argument set. Parsing validates the raw object first (so error
//! messages match what the oracle sent), then deserializes payloads into
//! typed operations for exhaustive dispatch.

use serde_json::{Map, Value};

use crate::core::validator::{parse_element, validate_element};
use crate::error::SchemaError;
use crate::process::ProcessElement;

/// Insertion anchor: exactly one of `before_id` / `after_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Before(String),
    After(String),
}

impl Anchor {
    /// The referenced sibling id.
    pub fn id(&self) -> &str {
        match self {
            Anchor::Before(id) | Anchor::After(id) => id,
        }
    }
}

/// One validated edit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    DeleteElement {
        element_id: String,
    },
    RedirectBranch {
        branch_condition: String,
        next_id: String,
    },
    AddElement {
        element: ProcessElement,
        anchor: Anchor,
    },
    MoveElement {
        element_id: String,
        anchor: Anchor,
    },
    UpdateElement {
        new_element: ProcessElement,
    },
}

impl EditOperation {
    /// The verb name as the oracle spells it.
    pub fn verb(&self) -> &'static str {
        match self {
            EditOperation::DeleteElement { .. } => "delete_element",
            EditOperation::RedirectBranch { .. } => "redirect_branch",
            EditOperation::AddElement { .. } => "add_element",
            EditOperation::MoveElement { .. } => "move_element",
            EditOperation::UpdateElement { .. } => "update_element",
        }
    }
}

/// A validated oracle proposal: one edit operation or a stop signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditProposal {
    Stop,
    Edit(EditOperation),
}

/// Validate and parse an oracle proposal.
///
/// `accept_stop` is false for the very first proposal of a session; a stop
/// marker is only meaningful once at least one edit round has run.
pub fn parse_proposal(proposal: &Value, accept_stop: bool) -> Result<EditProposal, SchemaError> {
    let object = proposal
        .as_object()
        .ok_or_else(|| SchemaError::new("edit proposal must be a JSON object"))?;

    if object.contains_key("stop") {
        if accept_stop {
            return Ok(EditProposal::Stop);
        }
        return Err(SchemaError::new(
            "'stop' is not a valid first proposal; propose an edit",
        ));
    }

    if !object.contains_key("function") || !object.contains_key("arguments") {
        return Err(SchemaError::new(
            "proposal must contain 'function' and 'arguments' keys, or a 'stop' key",
        ));
    }

    let function = object
        .get("function")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::new("'function' must be a string"))?;
    let arguments = object
        .get("arguments")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::new("'arguments' must be a JSON object"))?;

    let operation = match function {
        "delete_element" => {
            require_exact_keys(function, arguments, &["element_id"])?;
            EditOperation::DeleteElement {
                element_id: require_string(function, arguments, "element_id")?,
            }
        }
        "redirect_branch" => {
            require_exact_keys(function, arguments, &["branch_condition", "next_id"])?;
            EditOperation::RedirectBranch {
                branch_condition: require_string(function, arguments, "branch_condition")?,
                next_id: require_string(function, arguments, "next_id")?,
            }
        }
        "add_element" => {
            let anchor = require_anchor(function, arguments)?;
            require_exact_keys(function, arguments, &["element", anchor_key(&anchor)])?;
            EditOperation::AddElement {
                element: require_element(function, arguments, "element")?,
                anchor,
            }
        }
        "move_element" => {
            let anchor = require_anchor(function, arguments)?;
            require_exact_keys(function, arguments, &["element_id", anchor_key(&anchor)])?;
            EditOperation::MoveElement {
                element_id: require_string(function, arguments, "element_id")?,
                anchor,
            }
        }
        "update_element" => {
            require_exact_keys(function, arguments, &["new_element"])?;
            EditOperation::UpdateElement {
                new_element: require_element(function, arguments, "new_element")?,
            }
        }
        other => {
            return Err(SchemaError::new(format!("unknown edit function '{other}'")));
        }
    };

    Ok(EditProposal::Edit(operation))
}

fn require_exact_keys(
    function: &str,
    arguments: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), SchemaError> {
    for key in arguments.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(SchemaError::new(format!(
                "'{function}' arguments accept only {}; got '{key}'",
                allowed
                    .iter()
                    .map(|k| format!("'{k}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
    }
    Ok(())
}

fn require_string(
    function: &str,
    arguments: &Map<String, Value>,
    key: &str,
) -> Result<String, SchemaError> {
    match arguments.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(SchemaError::new(format!(
            "'{function}' argument '{key}' must be a string"
        ))),
        None => Err(SchemaError::new(format!(
            "'{function}' arguments must contain '{key}'"
        ))),
    }
}

fn require_element(
    function: &str,
    arguments: &Map<String, Value>,
    key: &str,
) -> Result<ProcessElement, SchemaError> {
    let value = arguments.get(key).ok_or_else(|| {
        SchemaError::new(format!("'{function}' arguments must contain '{key}'"))
    })?;
    validate_element(value)?;
    parse_element(value)
}

fn require_anchor(
    function: &str,
    arguments: &Map<String, Value>,
) -> Result<Anchor, SchemaError> {
    let before = arguments.get("before_id");
    let after = arguments.get("after_id");
    match (before, after) {
        (Some(_), Some(_)) => Err(SchemaError::new(format!(
            "'{function}' takes exactly one of 'before_id' and 'after_id', not both"
        ))),
        (None, None) => Err(SchemaError::new(format!(
            "'{function}' requires one of 'before_id' or 'after_id'"
        ))),
        (Some(_), None) => Ok(Anchor::Before(require_string(function, arguments, "before_id")?)),
        (None, Some(_)) => Ok(Anchor::After(require_string(function, arguments, "after_id")?)),
    }
}

fn anchor_key(anchor: &Anchor) -> &'static str {
    match anchor {
        Anchor::Before(_) => "before_id",
        Anchor::After(_) => "after_id",
    }
}
