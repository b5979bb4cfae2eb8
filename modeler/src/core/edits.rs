//! Edit function library: five pure tree transforms.
//!
//! Every transform rebuilds the tree from scratch and returns a fresh value;
//! the input is never aliased, so a failed retry can always fall back to the
//! last known-good tree. Failures are [`StructuralError`]s naming the missing
//! id or illegal move.

use crate::core::proposal::{Anchor, EditOperation};
use crate::error::StructuralError;
use crate::process::{
    ElementKind, Process, ProcessElement, contains_id, find_element, subtree_contains,
};

/// Apply one validated operation, dispatching on the verb.
pub fn apply_operation(
    process: &[ProcessElement],
    operation: &EditOperation,
) -> Result<Process, StructuralError> {
    match operation {
        EditOperation::DeleteElement { element_id } => delete_element(process, element_id),
        EditOperation::RedirectBranch {
            branch_condition,
            next_id,
        } => redirect_branch(process, branch_condition, next_id),
        EditOperation::AddElement { element, anchor } => {
            add_element(process, element.clone(), anchor)
        }
        EditOperation::MoveElement { element_id, anchor } => {
            move_element(process, element_id, anchor)
        }
        EditOperation::UpdateElement { new_element } => {
            update_element(process, new_element.clone())
        }
    }
}

/// Remove the element (and its whole subtree if a gateway) at whatever depth
/// it lives.
pub fn delete_element(
    process: &[ProcessElement],
    element_id: &str,
) -> Result<Process, StructuralError> {
    let (next, removed) = remove_by_id(process, element_id);
    if removed.is_none() {
        return Err(missing_element(element_id));
    }
    Ok(next)
}

/// Insert `element` as an immediate sibling adjacent to the anchor id, at
/// that id's depth.
///
/// The new element must itself satisfy the per-element grammar; the rest of
/// the tree is not re-validated.
pub fn add_element(
    process: &[ProcessElement],
    element: ProcessElement,
    anchor: &Anchor,
) -> Result<Process, StructuralError> {
    ensure_element_grammar(&element)?;
    let (next, inserted) = insert_adjacent(process, &element, anchor);
    if !inserted {
        return Err(missing_element(anchor.id()));
    }
    Ok(next)
}

/// Detach the subtree rooted at `element_id` and reinsert it adjacent to the
/// anchor id in the remaining tree.
pub fn move_element(
    process: &[ProcessElement],
    element_id: &str,
    anchor: &Anchor,
) -> Result<Process, StructuralError> {
    let moved = find_element(process, element_id).ok_or_else(|| missing_element(element_id))?;
    if !contains_id(process, anchor.id()) {
        return Err(missing_element(anchor.id()));
    }
    if subtree_contains(moved, anchor.id()) {
        return Err(StructuralError::new(format!(
            "cannot move element '{element_id}' relative to '{}': the target lies inside the moved subtree",
            anchor.id()
        )));
    }

    let (without, removed) = remove_by_id(process, element_id);
    let moved = removed.ok_or_else(|| missing_element(element_id))?;
    let (next, inserted) = insert_adjacent(&without, &moved, anchor);
    if !inserted {
        return Err(missing_element(anchor.id()));
    }
    Ok(next)
}

/// Replace the element sharing `new_element`'s id in place, preserving its
/// position. Idempotent for an identical element.
pub fn update_element(
    process: &[ProcessElement],
    new_element: ProcessElement,
) -> Result<Process, StructuralError> {
    let (next, replaced) = replace_by_id(process, &new_element);
    if !replaced {
        return Err(missing_element(&new_element.id));
    }
    Ok(next)
}

/// Re-point the continuation of the exclusive-gateway branch bearing
/// `branch_condition` to `next_id`, without relocating `next_id`.
pub fn redirect_branch(
    process: &[ProcessElement],
    branch_condition: &str,
    next_id: &str,
) -> Result<Process, StructuralError> {
    if !contains_id(process, next_id) {
        return Err(missing_element(next_id));
    }
    let (next, redirected) = set_branch_next(process, branch_condition, next_id);
    if !redirected {
        return Err(StructuralError::new(format!(
            "no exclusive gateway branch carries the condition '{branch_condition}'"
        )));
    }
    Ok(next)
}

fn missing_element(id: &str) -> StructuralError {
    StructuralError::new(format!("element '{id}' does not exist in the process"))
}

/// Per-element grammar rules the type system cannot enforce, checked through
/// the element's own subtree.
fn ensure_element_grammar(element: &ProcessElement) -> Result<(), StructuralError> {
    if let Some(label) = element.kind.label() {
        if label.trim().is_empty() {
            return Err(StructuralError::new(format!(
                "{} element '{}' has an empty 'label'",
                element.kind.type_name(),
                element.id
            )));
        }
    }
    match &element.kind {
        ElementKind::ExclusiveGateway { branches, .. } => {
            for branch in branches {
                for nested in &branch.path {
                    ensure_element_grammar(nested)?;
                }
            }
        }
        ElementKind::ParallelGateway { branches } => {
            for branch in branches {
                for nested in branch {
                    ensure_element_grammar(nested)?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Rebuild the sequence without the first element matching `id`, returning
/// the removed element.
fn remove_by_id(process: &[ProcessElement], id: &str) -> (Process, Option<ProcessElement>) {
    let mut removed = None;
    let mut result = Vec::with_capacity(process.len());
    for element in process {
        if removed.is_none() && element.id == id {
            removed = Some(element.clone());
            continue;
        }
        let mut element = element.clone();
        if removed.is_none() {
            match &mut element.kind {
                ElementKind::ExclusiveGateway { branches, .. } => {
                    for branch in &mut *branches {
                        if removed.is_some() {
                            break;
                        }
                        let (path, found) = remove_by_id(&branch.path, id);
                        branch.path = path;
                        removed = found;
                    }
                }
                ElementKind::ParallelGateway { branches } => {
                    for branch in &mut *branches {
                        if removed.is_some() {
                            break;
                        }
                        let (path, found) = remove_by_id(branch, id);
                        *branch = path;
                        removed = found;
                    }
                }
                _ => {}
            }
        }
        result.push(element);
    }
    (result, removed)
}

/// Rebuild the sequence with `element` inserted as a sibling of the anchor.
fn insert_adjacent(
    process: &[ProcessElement],
    element: &ProcessElement,
    anchor: &Anchor,
) -> (Process, bool) {
    let mut inserted = false;
    let mut result = Vec::with_capacity(process.len() + 1);
    for current in process {
        if !inserted && current.id == anchor.id() {
            match anchor {
                Anchor::Before(_) => {
                    result.push(element.clone());
                    result.push(current.clone());
                }
                Anchor::After(_) => {
                    result.push(current.clone());
                    result.push(element.clone());
                }
            }
            inserted = true;
            continue;
        }
        let mut current = current.clone();
        if !inserted {
            match &mut current.kind {
                ElementKind::ExclusiveGateway { branches, .. } => {
                    for branch in &mut *branches {
                        if inserted {
                            break;
                        }
                        let (path, found) = insert_adjacent(&branch.path, element, anchor);
                        branch.path = path;
                        inserted = found;
                    }
                }
                ElementKind::ParallelGateway { branches } => {
                    for branch in &mut *branches {
                        if inserted {
                            break;
                        }
                        let (path, found) = insert_adjacent(branch, element, anchor);
                        *branch = path;
                        inserted = found;
                    }
                }
                _ => {}
            }
        }
        result.push(current);
    }
    (result, inserted)
}

/// Rebuild the sequence with the element sharing `new_element`'s id replaced.
fn replace_by_id(process: &[ProcessElement], new_element: &ProcessElement) -> (Process, bool) {
    let mut replaced = false;
    let mut result = Vec::with_capacity(process.len());
    for element in process {
        if !replaced && element.id == new_element.id {
            result.push(new_element.clone());
            replaced = true;
            continue;
        }
        let mut element = element.clone();
        if !replaced {
            match &mut element.kind {
                ElementKind::ExclusiveGateway { branches, .. } => {
                    for branch in &mut *branches {
                        if replaced {
                            break;
                        }
                        let (path, found) = replace_by_id(&branch.path, new_element);
                        branch.path = path;
                        replaced = found;
                    }
                }
                ElementKind::ParallelGateway { branches } => {
                    for branch in &mut *branches {
                        if replaced {
                            break;
                        }
                        let (path, found) = replace_by_id(branch, new_element);
                        *branch = path;
                        replaced = found;
                    }
                }
                _ => {}
            }
        }
        result.push(element);
    }
    (result, replaced)
}

/// Rebuild the sequence with the matching branch's `next` set to `next_id`.
fn set_branch_next(
    process: &[ProcessElement],
    branch_condition: &str,
    next_id: &str,
) -> (Process, bool) {
    let mut redirected = false;
    let mut result = Vec::with_capacity(process.len());
    for element in process {
        let mut element = element.clone();
        if !redirected {
            match &mut element.kind {
                ElementKind::ExclusiveGateway { branches, .. } => {
                    for branch in &mut *branches {
                        if redirected {
                            break;
                        }
                        if branch.condition == branch_condition {
                            branch.next = Some(next_id.to_string());
                            redirected = true;
                            break;
                        }
                        let (path, found) = set_branch_next(&branch.path, branch_condition, next_id);
                        branch.path = path;
                        redirected = found;
                    }
                }
                ElementKind::ParallelGateway { branches } => {
                    for branch in &mut *branches {
                        if redirected {
                            break;
                        }
                        let (path, found) = set_branch_next(branch, branch_condition, next_id);
                        *branch = path;
                        redirected = found;
                    }
                }
                _ => {}
            }
        }
        result.push(element);
    }
    (result, redirected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{branch, exclusive, labeled_task, parallel, task};

    fn ids(process: &[ProcessElement]) -> Vec<&str> {
        process.iter().map(|element| element.id.as_str()).collect()
    }

    #[test]
    fn delete_removes_a_top_level_element() {
        let process = vec![task("a"), task("b"), task("c")];
        let next = delete_element(&process, "b").expect("delete");
        assert_eq!(ids(&next), vec!["a", "c"]);
        // The input tree is untouched.
        assert_eq!(ids(&process), vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_fails_for_a_nonexistent_id() {
        let process = vec![task("a")];
        let err = delete_element(&process, "zz").expect_err("should fail");
        assert_eq!(err.to_string(), "element 'zz' does not exist in the process");
    }

    #[test]
    fn delete_removes_a_gateway_with_its_subtree() {
        let process = vec![
            task("a"),
            exclusive("g1", vec![branch("yes", vec![task("inner")])]),
        ];
        let next = delete_element(&process, "g1").expect("delete");
        assert_eq!(ids(&next), vec!["a"]);
        assert!(!contains_id(&next, "inner"));
    }

    #[test]
    fn delete_reaches_nested_elements() {
        let process = vec![parallel(
            "p1",
            vec![vec![task("x"), task("y")], vec![task("z")]],
        )];
        let next = delete_element(&process, "y").expect("delete");
        assert!(contains_id(&next, "x"));
        assert!(!contains_id(&next, "y"));
        assert!(contains_id(&next, "z"));
    }

    #[test]
    fn add_inserts_adjacent_to_the_anchor() {
        let process = vec![task("a"), task("b")];
        let next = add_element(&process, task("n"), &Anchor::After("a".to_string())).expect("add");
        assert_eq!(ids(&next), vec!["a", "n", "b"]);
        let next = add_element(&process, task("n"), &Anchor::Before("a".to_string())).expect("add");
        assert_eq!(ids(&next), vec!["n", "a", "b"]);
    }

    #[test]
    fn add_inserts_at_the_anchors_depth() {
        let process = vec![exclusive("g1", vec![branch("yes", vec![task("inner")])])];
        let next =
            add_element(&process, task("n"), &Anchor::After("inner".to_string())).expect("add");
        let ElementKind::ExclusiveGateway { branches, .. } = &next[0].kind else {
            panic!("expected gateway");
        };
        assert_eq!(ids(&branches[0].path), vec!["inner", "n"]);
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn add_fails_for_a_missing_anchor() {
        let err = add_element(&[task("a")], task("n"), &Anchor::After("zz".to_string()))
            .expect_err("should fail");
        assert!(err.to_string().contains("'zz' does not exist"));
    }

    #[test]
    fn add_rejects_an_element_with_an_empty_label() {
        let err = add_element(
            &[task("a")],
            labeled_task("n", "   "),
            &Anchor::After("a".to_string()),
        )
        .expect_err("should fail");
        assert!(err.to_string().contains("empty 'label'"));
    }

    #[test]
    fn move_reorders_siblings_after_detachment() {
        let process = vec![task("a"), task("b"), task("c")];
        let next = move_element(&process, "a", &Anchor::After("b".to_string())).expect("move");
        assert_eq!(ids(&next), vec!["b", "a", "c"]);
    }

    #[test]
    fn move_lifts_a_nested_element_to_the_anchor_depth() {
        let process = vec![
            exclusive("g1", vec![branch("yes", vec![task("inner")])]),
            task("c"),
        ];
        let next = move_element(&process, "inner", &Anchor::Before("c".to_string())).expect("move");
        assert_eq!(ids(&next), vec!["g1", "inner", "c"]);
        let ElementKind::ExclusiveGateway { branches, .. } = &next[0].kind else {
            panic!("expected gateway");
        };
        assert!(branches[0].path.is_empty());
    }

    #[test]
    fn move_rejects_a_target_inside_the_moved_subtree() {
        let process = vec![exclusive("g1", vec![branch("yes", vec![task("inner")])])];
        let err = move_element(&process, "g1", &Anchor::Before("inner".to_string()))
            .expect_err("should fail");
        assert!(err.to_string().contains("inside the moved subtree"));
    }

    #[test]
    fn move_fails_when_either_id_is_missing() {
        let process = vec![task("a"), task("b")];
        let err = move_element(&process, "zz", &Anchor::After("a".to_string()))
            .expect_err("missing element");
        assert!(err.to_string().contains("'zz' does not exist"));
        let err = move_element(&process, "a", &Anchor::After("zz".to_string()))
            .expect_err("missing anchor");
        assert!(err.to_string().contains("'zz' does not exist"));
    }

    #[test]
    fn update_replaces_in_place_and_is_idempotent() {
        let process = vec![task("a"), task("b"), task("c")];
        let replacement = labeled_task("b", "Renamed");
        let once = update_element(&process, replacement.clone()).expect("update");
        assert_eq!(ids(&once), vec!["a", "b", "c"]);
        assert_eq!(once[1].kind.label(), Some("Renamed"));

        let twice = update_element(&once, replacement).expect("update again");
        assert_eq!(once, twice);
    }

    #[test]
    fn update_reaches_nested_elements() {
        let process = vec![exclusive("g1", vec![branch("yes", vec![task("inner")])])];
        let next = update_element(&process, labeled_task("inner", "Changed")).expect("update");
        let ElementKind::ExclusiveGateway { branches, .. } = &next[0].kind else {
            panic!("expected gateway");
        };
        assert_eq!(branches[0].path[0].kind.label(), Some("Changed"));
    }

    #[test]
    fn update_fails_for_a_nonexistent_id() {
        let err = update_element(&[task("a")], task("zz")).expect_err("should fail");
        assert!(err.to_string().contains("'zz' does not exist"));
    }

    #[test]
    fn redirect_sets_the_branch_continuation() {
        let process = vec![
            task("a"),
            exclusive(
                "g1",
                vec![branch("yes", vec![task("x")]), branch("no", vec![])],
            ),
        ];
        let next = redirect_branch(&process, "no", "a").expect("redirect");
        let ElementKind::ExclusiveGateway { branches, .. } = &next[1].kind else {
            panic!("expected gateway");
        };
        assert_eq!(branches[1].next.as_deref(), Some("a"));
        // The redirected element stays where it was.
        assert_eq!(ids(&next), vec!["a", "g1"]);
    }

    #[test]
    fn redirect_fails_for_unknown_condition_or_id() {
        let process = vec![task("a"), exclusive("g1", vec![branch("yes", vec![])])];
        let err = redirect_branch(&process, "maybe", "a").expect_err("unknown condition");
        assert!(err.to_string().contains("condition 'maybe'"));
        let err = redirect_branch(&process, "yes", "zz").expect_err("unknown id");
        assert!(err.to_string().contains("'zz' does not exist"));
    }

    #[test]
    fn apply_operation_dispatches_each_verb() {
        let process = vec![task("a"), task("b")];
        let deleted = apply_operation(
            &process,
            &EditOperation::DeleteElement {
                element_id: "a".to_string(),
            },
        )
        .expect("delete");
        assert_eq!(ids(&deleted), vec!["b"]);

        let moved = apply_operation(
            &process,
            &EditOperation::MoveElement {
                element_id: "a".to_string(),
                anchor: Anchor::After("b".to_string()),
            },
        )
        .expect("move");
        assert_eq!(ids(&moved), vec!["b", "a"]);
    }
}
