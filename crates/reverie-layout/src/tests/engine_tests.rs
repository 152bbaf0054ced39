use super::*;
use crate::frame::ScrollOffsets;
use reverie_core::{Node, Size};

fn fixed(width: f32, height: f32) -> Node {
    Node::new("box")
        .prop("width", f64::from(width))
        .prop("height", f64::from(height))
}

fn layout(tree: &Node, width: f32, height: f32) -> Frame {
    layout_tree(tree, Size::new(width, height), &NoLeaves, &ScrollOffsets::default())
}

#[test]
fn row_sums_children_and_spacing() {
    let tree = Node::new("row")
        .prop("spacing", 10.0)
        .child(fixed(50.0, 20.0))
        .child(fixed(30.0, 20.0));
    let frame = layout(&tree, 200.0, 100.0);
    assert_eq!(frame.rect.width, 90.0);
    assert_eq!(frame.children[0].rect.x, 0.0);
    assert_eq!(frame.children[1].rect.x, 60.0);
}

#[test]
fn column_conserves_main_axis_extent() {
    let tree = Node::new("column")
        .prop("spacing", 4.0)
        .prop("padding", 8.0)
        .child(fixed(10.0, 30.0))
        .child(fixed(10.0, 20.0))
        .child(fixed(10.0, 10.0));
    let frame = layout(&tree, 500.0, 500.0);
    // 30 + 20 + 10 children, 2 gaps of 4, padding top and bottom.
    assert_eq!(frame.rect.height, 30.0 + 20.0 + 10.0 + 8.0 + 16.0);
    assert_eq!(frame.children[0].rect.y, 8.0);
    assert_eq!(frame.children[1].rect.y, 42.0);
}

#[test]
fn measured_size_clamps_to_constraint() {
    let tree = Node::new("row").child(fixed(300.0, 20.0)).child(fixed(300.0, 20.0));
    let frame = layout(&tree, 200.0, 100.0);
    assert_eq!(frame.rect.width, 200.0);
}

#[test]
fn explicit_size_never_exceeds_incoming_constraint() {
    let tree = fixed(500.0, 40.0);
    let frame = layout(&tree, 200.0, 100.0);
    assert_eq!(frame.rect.width, 200.0);
    assert_eq!(frame.rect.height, 40.0);
}

#[test]
fn later_children_see_consumed_main_axis_space() {
    // Second child is unconstrained in itself; it inherits what the first
    // child and the gap left over.
    let greedy = Node::new("row").child(fixed(120.0, 10.0)).child(
        Node::new("row").prop("spacing", 0.0).child(fixed(500.0, 10.0)),
    );
    let frame = layout(&greedy, 200.0, 50.0);
    assert_eq!(frame.children[1].rect.width, 80.0);
}

#[test]
fn spacers_split_free_space_evenly() {
    let tree = Node::new("row")
        .child(fixed(40.0, 10.0))
        .child(Node::new("spacer"))
        .child(fixed(40.0, 10.0))
        .child(Node::new("spacer"))
        .child(fixed(40.0, 10.0));
    let frame = layout(&tree, 200.0, 50.0);
    // 200 - 120 fixed = 80 free, split across two spacers.
    assert_eq!(frame.children[1].rect.width, 40.0);
    assert_eq!(frame.children[3].rect.width, 40.0);
    assert_eq!(frame.children[4].rect.x, 160.0);
}

#[test]
fn spacer_minimums_are_respected_when_space_allows() {
    let tree = Node::new("row")
        .child(fixed(100.0, 10.0))
        .child(Node::new("spacer").prop("min_size", 70.0))
        .child(Node::new("spacer"));
    let frame = layout(&tree, 200.0, 50.0);
    // 100 free: the 70-minimum spacer pins, the other takes the remainder.
    assert_eq!(frame.children[1].rect.width, 70.0);
    assert_eq!(frame.children[2].rect.width, 30.0);
}

#[test]
fn overflowing_spacer_minimums_shrink_by_ratio() {
    let tree = Node::new("row")
        .child(fixed(150.0, 10.0))
        .child(Node::new("spacer").prop("min_size", 30.0))
        .child(Node::new("spacer").prop("min_size", 70.0));
    let frame = layout(&tree, 200.0, 50.0);
    // Only 50 free against 100 of minimums: each shrinks to its share.
    assert_eq!(frame.children[1].rect.width, 15.0);
    assert_eq!(frame.children[2].rect.width, 35.0);
    let total: f32 = frame.children.iter().map(|c| c.rect.width).sum();
    assert_eq!(total, 200.0);
}

#[test]
fn cross_axis_alignment_positions_children() {
    let centered = Node::new("row")
        .prop("align", "center")
        .prop("height", 100.0)
        .child(fixed(10.0, 40.0));
    let frame = layout(&centered, 200.0, 200.0);
    assert_eq!(frame.children[0].rect.y, 30.0);

    let stretched = Node::new("row")
        .prop("align", "stretch")
        .prop("height", 100.0)
        .child(fixed(10.0, 40.0));
    let frame = layout(&stretched, 200.0, 200.0);
    assert_eq!(frame.children[0].rect.height, 100.0);
}

#[test]
fn stack_overlays_children() {
    let tree = Node::new("stack")
        .prop("align", "center")
        .prop("width", 100.0)
        .prop("height", 100.0)
        .child(fixed(100.0, 100.0))
        .child(fixed(20.0, 10.0));
    let frame = layout(&tree, 300.0, 300.0);
    assert_eq!(frame.children[0].rect, reverie_core::Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(frame.children[1].rect.x, 40.0);
    assert_eq!(frame.children[1].rect.y, 45.0);
}

#[test]
fn scroll_exposes_content_and_clamped_offset() {
    let tree = Node::new("scroll")
        .key("list")
        .prop("height", 100.0)
        .child(fixed(50.0, 80.0))
        .child(fixed(50.0, 80.0))
        .child(fixed(50.0, 80.0));
    let mut offsets = ScrollOffsets::default();
    offsets.set("list", 1e6);
    let frame = layout_tree(&tree, Size::new(200.0, 300.0), &NoLeaves, &offsets);
    let scroll = frame.scroll.unwrap();
    assert_eq!(scroll.content_height, 240.0);
    assert_eq!(scroll.max_offset, 140.0);
    // An absurd stored offset reads back clamped.
    assert_eq!(scroll.offset, 140.0);
    // Children shift up by the offset.
    assert_eq!(frame.children[0].rect.y, -140.0);
}

#[test]
fn scroll_with_short_content_has_zero_max() {
    let tree = Node::new("scroll")
        .key("list")
        .prop("height", 100.0)
        .child(fixed(50.0, 30.0));
    let frame = layout(&tree, 200.0, 300.0);
    let scroll = frame.scroll.unwrap();
    assert_eq!(scroll.max_offset, 0.0);
    assert_eq!(scroll.offset, 0.0);
}

#[test]
fn grid_row_major_uniform_cells() {
    let tree = Node::new("grid")
        .prop("columns", 2i64)
        .prop("spacing", 10.0)
        .child(fixed(30.0, 20.0))
        .child(fixed(30.0, 40.0))
        .child(fixed(30.0, 25.0));
    let frame = layout(&tree, 210.0, 500.0);
    // Cell width (210 - 10) / 2 = 100; second column starts past it.
    assert_eq!(frame.children[1].rect.x, 110.0);
    // Second row starts after the tallest first-row child plus spacing.
    assert_eq!(frame.children[2].rect.y, 50.0);
    assert_eq!(frame.rect.height, 20.0f32.max(40.0) + 10.0 + 25.0);
}

#[test]
fn grid_column_major_uniform_cells() {
    let tree = Node::new("grid")
        .prop("columns", 2i64)
        .prop("grid_axis", "column")
        .prop("spacing", 10.0)
        .child(fixed(20.0, 30.0))
        .child(fixed(40.0, 30.0))
        .child(fixed(25.0, 30.0));
    let frame = layout(&tree, 500.0, 210.0);
    // Cell height (210 - 10) / 2 = 100; second row starts past it.
    assert_eq!(frame.children[1].rect.y, 110.0);
    // Second column starts after the widest first-column child plus spacing.
    assert_eq!(frame.children[2].rect.x, 50.0);
}

#[test]
fn unknown_kinds_measure_like_stacks() {
    let tree = Node::new("mystery")
        .prop("padding", 5.0)
        .child(fixed(30.0, 20.0));
    let frame = layout(&tree, 200.0, 200.0);
    assert_eq!(frame.rect.width, 40.0);
    assert_eq!(frame.rect.height, 30.0);
    assert_eq!(frame.children[0].rect.x, 5.0);
}

#[test]
fn registered_leaf_measurement_wins() {
    struct FixedText;
    impl LeafMeasure for FixedText {
        fn measure_leaf(&self, node: &Node, _c: Constraints) -> Option<Size> {
            (node.kind() == "text").then(|| Size::new(64.0, 16.0))
        }
    }
    let tree = Node::new("row").child(Node::new("text"));
    let frame = layout_tree(
        &tree,
        Size::new(200.0, 200.0),
        &FixedText,
        &ScrollOffsets::default(),
    );
    assert_eq!(frame.children[0].rect.size(), Size::new(64.0, 16.0));
}

#[test]
fn frame_tree_stays_parallel_to_node_tree() {
    let tree = Node::new("column")
        .child(Node::new("row").child(fixed(10.0, 10.0)).child(fixed(10.0, 10.0)))
        .child(Node::new("grid").prop("columns", 2i64).child(fixed(5.0, 5.0)));
    let frame = layout(&tree, 100.0, 100.0);
    assert_eq!(frame.children.len(), 2);
    assert_eq!(frame.children[0].children.len(), 2);
    assert_eq!(frame.children[1].children.len(), 1);
    assert!(frame.at_path(&[0, 1]).is_some());
    assert!(frame.at_path(&[2]).is_none());
}
