//! Structural passes run on a freshly built tree before styling and diffing.

use crate::node::Node;
use crate::{KIND_GROUP, KIND_STACK};

/// Splice the children of transparent grouping nodes into their parents,
/// recursively. Groups carry no layout or paint semantics of their own.
pub fn flatten_groups(node: &mut Node) {
    let children = std::mem::take(node.child_nodes_mut());
    let mut flattened = Vec::with_capacity(children.len());
    for mut child in children {
        flatten_groups(&mut child);
        if child.kind() == KIND_GROUP {
            flattened.append(child.child_nodes_mut());
        } else {
            flattened.push(child);
        }
    }
    *node.child_nodes_mut() = flattened;
}

/// Flatten groups everywhere, then normalize the root: a root that is
/// itself a transparent group collapses to its single child, or wraps its
/// children in an implicit stack container.
pub fn normalize_tree(mut root: Node) -> Node {
    flatten_groups(&mut root);
    if root.kind() != KIND_GROUP {
        return root;
    }
    let children = std::mem::take(root.child_nodes_mut());
    match children.len() {
        1 => children.into_iter().next().expect("checked length"),
        _ => Node::new(KIND_STACK).children(children),
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
