//! Process tree grammar validation.
//!
//! Validation runs on the raw JSON the oracle returned, so error messages can
//! cite exactly what was sent; [`parse_process`] then deserializes into the
//! typed tree. The first violation aborts; there is no notion of partial
//! validity.

use serde_json::Value;

use crate::error::SchemaError;
use crate::process::{ELEMENT_TYPES, Process, ProcessElement};

/// Validate a whole process tree against the element grammar.
///
/// Recursive descent over the sequence; the error names the offending element
/// and the violated rule.
pub fn validate_process(process: &Value) -> Result<(), SchemaError> {
    let elements = process
        .as_array()
        .ok_or_else(|| SchemaError::new("process must be a JSON array of elements"))?;
    for element in elements {
        validate_element(element)?;
    }
    Ok(())
}

/// Validate one element, recursing into its own gateway branches.
pub fn validate_element(element: &Value) -> Result<(), SchemaError> {
    let object = element.as_object().ok_or_else(|| {
        SchemaError::new(format!("process element must be a JSON object: {element}"))
    })?;

    let id = match object.get("id").and_then(Value::as_str) {
        Some(id) => id,
        None => {
            return Err(SchemaError::new(format!(
                "element is missing a string 'id': {element}"
            )));
        }
    };

    let element_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::new(format!("element '{id}' is missing a string 'type'")))?;

    match element_type {
        "task" | "userTask" | "serviceTask" => validate_task(object, id, element_type),
        "exclusiveGateway" => validate_exclusive_gateway(object, id),
        "parallelGateway" => validate_parallel_gateway(object, id),
        other => Err(SchemaError::new(format!(
            "unsupported element type '{other}' on element '{id}' (supported: {})",
            ELEMENT_TYPES.join(", ")
        ))),
    }
}

/// Parse a validated process value into the typed tree.
pub fn parse_process(process: &Value) -> Result<Process, SchemaError> {
    serde_json::from_value(process.clone()).map_err(|err| {
        SchemaError::new(format!("process does not match the element grammar: {err}"))
    })
}

/// Parse one validated element value into a typed element.
pub fn parse_element(element: &Value) -> Result<ProcessElement, SchemaError> {
    serde_json::from_value(element.clone()).map_err(|err| {
        SchemaError::new(format!("element does not match the element grammar: {err}"))
    })
}

fn validate_task(
    object: &serde_json::Map<String, Value>,
    id: &str,
    element_type: &str,
) -> Result<(), SchemaError> {
    let label = object
        .get("label")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::new(format!("{element_type} element '{id}' is missing a string 'label'")))?;
    if label.trim().is_empty() {
        return Err(SchemaError::new(format!(
            "{element_type} element '{id}' has an empty 'label'"
        )));
    }
    Ok(())
}

fn validate_exclusive_gateway(
    object: &serde_json::Map<String, Value>,
    id: &str,
) -> Result<(), SchemaError> {
    if object.get("label").and_then(Value::as_str).is_none() {
        return Err(SchemaError::new(format!(
            "exclusive gateway '{id}' is missing a string 'label'"
        )));
    }
    let branches = object
        .get("branches")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SchemaError::new(format!("exclusive gateway '{id}' is missing a 'branches' array"))
        })?;
    for branch in branches {
        let branch_object = branch.as_object().ok_or_else(|| {
            SchemaError::new(format!(
                "invalid branch in exclusive gateway '{id}': expected an object, got {branch}"
            ))
        })?;
        if branch_object.get("condition").and_then(Value::as_str).is_none() {
            return Err(SchemaError::new(format!(
                "invalid branch in exclusive gateway '{id}': missing a string 'condition'"
            )));
        }
        let path = branch_object
            .get("path")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::new(format!(
                    "invalid branch in exclusive gateway '{id}': missing a 'path' array"
                ))
            })?;
        if let Some(next) = branch_object.get("next") {
            if !next.is_string() {
                return Err(SchemaError::new(format!(
                    "invalid branch in exclusive gateway '{id}': 'next' must be a string"
                )));
            }
        }
        for element in path {
            validate_element(element)?;
        }
    }
    Ok(())
}

fn validate_parallel_gateway(
    object: &serde_json::Map<String, Value>,
    id: &str,
) -> Result<(), SchemaError> {
    let branches = object
        .get("branches")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SchemaError::new(format!("parallel gateway '{id}' is missing a 'branches' array"))
        })?;
    for branch in branches {
        let path = branch.as_array().ok_or_else(|| {
            SchemaError::new(format!(
                "invalid branch in parallel gateway '{id}': expected an array of elements"
            ))
        })?;
        for element in path {
            validate_element(element)?;
        }
    }
    Ok(())
}
