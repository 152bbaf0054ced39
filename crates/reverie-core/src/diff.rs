//! Structural, position-indexed diff between two node trees.
//!
//! The walk pairs children by index, not by key: reordering children
//! produces prop patches rather than moves, a deliberate limitation traded
//! for a cheap, predictable diff (matched-geometry tags recover visual
//! continuity where it matters). Equal-kind children of different identity
//! at the same index are likewise indistinguishable from "same node,
//! properties changed" plus trailing inserts/removes.

use crate::node::Node;
use crate::value::Value;

/// One structural or property difference, addressed by a child-index path
/// from the root. For `InsertChild`/`RemoveChild` the path addresses the
/// affected child slot itself.
#[derive(Clone, Debug, PartialEq)]
pub enum PatchOp {
    SetProp {
        path: Vec<usize>,
        name: String,
        value: Value,
    },
    RemoveProp {
        path: Vec<usize>,
        name: String,
    },
    ReplaceNode {
        path: Vec<usize>,
        node: Node,
    },
    InsertChild {
        path: Vec<usize>,
        node: Node,
    },
    RemoveChild {
        path: Vec<usize>,
    },
}

impl PatchOp {
    pub fn path(&self) -> &[usize] {
        match self {
            PatchOp::SetProp { path, .. }
            | PatchOp::RemoveProp { path, .. }
            | PatchOp::ReplaceNode { path, .. }
            | PatchOp::InsertChild { path, .. }
            | PatchOp::RemoveChild { path } => path,
        }
    }
}

/// Compute the ordered patch list turning `old` into `new`.
pub fn diff(old: &Node, new: &Node) -> Vec<PatchOp> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    diff_node(old, new, &mut path, &mut patches);
    patches
}

fn diff_node(old: &Node, new: &Node, path: &mut Vec<usize>, patches: &mut Vec<PatchOp>) {
    if old.kind() != new.kind() {
        patches.push(PatchOp::ReplaceNode {
            path: path.clone(),
            node: new.clone(),
        });
        return;
    }

    for (name, value) in new.props() {
        if old.get_prop(name) != Some(value) {
            patches.push(PatchOp::SetProp {
                path: path.clone(),
                name: name.to_owned(),
                value: value.clone(),
            });
        }
    }
    for (name, _) in old.props() {
        if new.get_prop(name).is_none() {
            patches.push(PatchOp::RemoveProp {
                path: path.clone(),
                name: name.to_owned(),
            });
        }
    }

    let old_children = old.child_nodes();
    let new_children = new.child_nodes();
    let shared = old_children.len().min(new_children.len());
    for index in 0..shared {
        path.push(index);
        diff_node(&old_children[index], &new_children[index], path, patches);
        path.pop();
    }
    for (index, child) in new_children.iter().enumerate().skip(shared) {
        let mut child_path = path.clone();
        child_path.push(index);
        patches.push(PatchOp::InsertChild {
            path: child_path,
            node: child.clone(),
        });
    }
    // Removals address the now-shorter tail, repeated length-difference
    // times.
    for _ in shared..old_children.len() {
        let mut child_path = path.clone();
        child_path.push(shared);
        patches.push(PatchOp::RemoveChild { path: child_path });
    }
}

/// Apply a patch list to a tree, yielding the patched copy. This is the
/// reference semantics for the patch vocabulary: `apply(old, diff(old,
/// new))` is structurally equal to `new`. Patches with stale paths are
/// skipped (soft failure, logged at debug).
pub fn apply(tree: &Node, patches: &[PatchOp]) -> Node {
    let mut result = tree.clone();
    for patch in patches {
        if !apply_one(&mut result, patch) {
            log::debug!("skipping patch with unresolvable path: {patch:?}");
        }
    }
    result
}

fn apply_one(tree: &mut Node, patch: &PatchOp) -> bool {
    match patch {
        PatchOp::SetProp { path, name, value } => match tree.node_at_mut(path) {
            Ok(node) => {
                node.set_prop(name.clone(), value.clone());
                true
            }
            Err(_) => false,
        },
        PatchOp::RemoveProp { path, name } => match tree.node_at_mut(path) {
            Ok(node) => {
                node.remove_prop(name);
                true
            }
            Err(_) => false,
        },
        PatchOp::ReplaceNode { path, node } => {
            if path.is_empty() {
                *tree = node.clone();
                return true;
            }
            let (parent_path, index) = split_last(path);
            match tree.node_at_mut(parent_path) {
                Ok(parent) if index < parent.child_nodes().len() => {
                    parent.child_nodes_mut()[index] = node.clone();
                    true
                }
                _ => false,
            }
        }
        PatchOp::InsertChild { path, node } => {
            let (parent_path, index) = split_last(path);
            match tree.node_at_mut(parent_path) {
                Ok(parent) if index <= parent.child_nodes().len() => {
                    parent.child_nodes_mut().insert(index, node.clone());
                    true
                }
                _ => false,
            }
        }
        PatchOp::RemoveChild { path } => {
            let (parent_path, index) = split_last(path);
            match tree.node_at_mut(parent_path) {
                Ok(parent) if index < parent.child_nodes().len() => {
                    parent.child_nodes_mut().remove(index);
                    true
                }
                _ => false,
            }
        }
    }
}

fn split_last(path: &[usize]) -> (&[usize], usize) {
    match path.split_last() {
        Some((last, rest)) => (rest, *last),
        None => (&[], 0),
    }
}

#[cfg(test)]
#[path = "tests/diff_tests.rs"]
mod tests;
