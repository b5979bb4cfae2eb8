//! Process tree data model.
//!
//! A process is an ordered sequence of typed elements; gateway branches nest
//! further sequences, forming a tree of arbitrary depth. Element ids are
//! unique across the whole tree and stable across edits.

use serde::{Deserialize, Serialize};

/// Ordered sequence of elements modeling one process (or one branch body).
pub type Process = Vec<ProcessElement>;

/// All recognized `type` discriminants, in wire spelling.
pub const ELEMENT_TYPES: [&str; 5] = [
    "task",
    "userTask",
    "serviceTask",
    "exclusiveGateway",
    "parallelGateway",
];

/// One node of the process tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessElement {
    pub id: String,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Element variants, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementKind {
    #[serde(rename = "task")]
    Task { label: String },
    #[serde(rename = "userTask")]
    UserTask { label: String },
    #[serde(rename = "serviceTask")]
    ServiceTask { label: String },
    #[serde(rename = "exclusiveGateway")]
    ExclusiveGateway {
        label: String,
        branches: Vec<ExclusiveBranch>,
    },
    #[serde(rename = "parallelGateway")]
    ParallelGateway { branches: Vec<Vec<ProcessElement>> },
}

/// One conditional branch of an exclusive gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusiveBranch {
    pub condition: String,
    pub path: Vec<ProcessElement>,
    /// Continuation override: id of the element the branch jumps to instead
    /// of falling through to the element after the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl ElementKind {
    /// The `type` discriminant as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Task { .. } => "task",
            ElementKind::UserTask { .. } => "userTask",
            ElementKind::ServiceTask { .. } => "serviceTask",
            ElementKind::ExclusiveGateway { .. } => "exclusiveGateway",
            ElementKind::ParallelGateway { .. } => "parallelGateway",
        }
    }

    /// The human-readable label, where the variant carries one.
    pub fn label(&self) -> Option<&str> {
        match self {
            ElementKind::Task { label }
            | ElementKind::UserTask { label }
            | ElementKind::ServiceTask { label }
            | ElementKind::ExclusiveGateway { label, .. } => Some(label),
            ElementKind::ParallelGateway { .. } => None,
        }
    }
}

/// Find an element by id at any depth.
pub fn find_element<'a>(process: &'a [ProcessElement], id: &str) -> Option<&'a ProcessElement> {
    for element in process {
        if element.id == id {
            return Some(element);
        }
        match &element.kind {
            ElementKind::ExclusiveGateway { branches, .. } => {
                for branch in branches {
                    if let Some(found) = find_element(&branch.path, id) {
                        return Some(found);
                    }
                }
            }
            ElementKind::ParallelGateway { branches } => {
                for branch in branches {
                    if let Some(found) = find_element(branch, id) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// True if some element in the process (at any depth) has the given id.
pub fn contains_id(process: &[ProcessElement], id: &str) -> bool {
    find_element(process, id).is_some()
}

/// True if `id` names the element itself or anything nested under it.
pub fn subtree_contains(element: &ProcessElement, id: &str) -> bool {
    if element.id == id {
        return true;
    }
    match &element.kind {
        ElementKind::ExclusiveGateway { branches, .. } => branches
            .iter()
            .any(|branch| contains_id(&branch.path, id)),
        ElementKind::ParallelGateway { branches } => {
            branches.iter().any(|branch| contains_id(branch, id))
        }
        _ => false,
    }
}

/// Render the process as pretty-printed JSON for prompt templates.
pub fn process_to_text(process: &[ProcessElement]) -> String {
    serde_json::to_string_pretty(process).expect("process trees serialize to JSON")
}
