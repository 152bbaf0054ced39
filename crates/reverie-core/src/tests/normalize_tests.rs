use super::*;

#[test]
fn groups_splice_into_their_parent() {
    let mut tree = Node::new("column")
        .child(Node::new("text").prop("text", "a"))
        .child(
            Node::new("group")
                .child(Node::new("text").prop("text", "b"))
                .child(Node::new("text").prop("text", "c")),
        )
        .child(Node::new("text").prop("text", "d"));
    flatten_groups(&mut tree);
    let texts: Vec<_> = tree
        .child_nodes()
        .iter()
        .map(|child| child.prop_str("text").unwrap().to_owned())
        .collect();
    assert_eq!(texts, ["a", "b", "c", "d"]);
}

#[test]
fn nested_groups_flatten_recursively() {
    let mut tree = Node::new("row").child(
        Node::new("group").child(Node::new("group").child(Node::new("button"))),
    );
    flatten_groups(&mut tree);
    assert_eq!(tree.child_nodes().len(), 1);
    assert_eq!(tree.child_nodes()[0].kind(), "button");
}

#[test]
fn single_child_group_root_collapses() {
    let root = Node::new("group").child(Node::new("button").key("only"));
    let tree = normalize_tree(root);
    assert_eq!(tree.kind(), "button");
    assert_eq!(tree.stable_key(), Some("only"));
}

#[test]
fn multi_child_group_root_wraps_in_stack() {
    let root = Node::new("group")
        .child(Node::new("button"))
        .child(Node::new("text"));
    let tree = normalize_tree(root);
    assert_eq!(tree.kind(), KIND_STACK);
    assert_eq!(tree.child_nodes().len(), 2);
}

#[test]
fn empty_group_root_becomes_empty_stack() {
    let tree = normalize_tree(Node::new("group"));
    assert_eq!(tree.kind(), KIND_STACK);
    assert!(tree.child_nodes().is_empty());
}

#[test]
fn non_group_root_is_untouched() {
    let root = Node::new("column").child(Node::new("group").child(Node::new("text")));
    let tree = normalize_tree(root);
    assert_eq!(tree.kind(), "column");
    assert_eq!(tree.child_nodes()[0].kind(), "text");
}
