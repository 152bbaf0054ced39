//! Hit-testing: find the topmost interactive node under a point.

use reverie_core::{Node, Rect};
use reverie_layout::{Frame, KIND_SCROLL};

/// Whether a node opted out of hit-testing: fully transparent, explicitly
/// `hit_test = false`, or `pointer_events = "none"`. Opting out hides the
/// whole subtree from the pointer.
pub(crate) fn non_interactive(node: &Node) -> bool {
    node.prop_f32("opacity") == Some(0.0)
        || node.prop_bool("hit_test") == Some(false)
        || node.prop_str("pointer_events") == Some("none")
}

pub(crate) fn clips(node: &Node) -> bool {
    node.kind() == KIND_SCROLL || node.prop_bool("clip") == Some(true)
}

/// Walk the frame tree back-to-front (last child first, so the topmost
/// paint order wins), intersecting clip rectangles from clipping ancestors.
/// Returns the path of the deepest hit.
pub fn hit_test(tree: &Node, frames: &Frame, x: f32, y: f32) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    walk(tree, frames, x, y, None, &mut path)
}

fn walk(
    node: &Node,
    frame: &Frame,
    x: f32,
    y: f32,
    clip: Option<Rect>,
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    if non_interactive(node) {
        return None;
    }
    if let Some(clip) = clip {
        if !clip.contains(x, y) {
            return None;
        }
    }
    let child_clip = if clips(node) {
        Some(match clip {
            Some(outer) => outer.intersect(&frame.rect),
            None => frame.rect,
        })
    } else {
        clip
    };

    for (index, (child, child_frame)) in node
        .child_nodes()
        .iter()
        .zip(&frame.children)
        .enumerate()
        .rev()
    {
        path.push(index);
        if let Some(hit) = walk(child, child_frame, x, y, child_clip, path) {
            return Some(hit);
        }
        path.pop();
    }

    frame.rect.contains(x, y).then(|| path.clone())
}

#[cfg(test)]
#[path = "tests/hit_tests.rs"]
mod tests;
