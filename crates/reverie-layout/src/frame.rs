//! The frame tree: resolved rectangles parallel to the node tree, plus the
//! scroll bookkeeping drag and wheel dispatch clamp against.

use hashbrown::HashMap;
use reverie_core::{Node, Rect};

/// Scroll geometry exposed on a scroll container's frame, for the scrollbar
/// indicator and for drag-based scrolling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollFrame {
    pub content_height: f32,
    pub offset: f32,
    pub max_offset: f32,
}

/// Resolved geometry for one node. One-to-one with the node tree by
/// position, rebuilt on every layout pass, never mutated by external code.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub rect: Rect,
    pub scroll: Option<ScrollFrame>,
    pub children: Vec<Frame>,
}

impl Frame {
    /// Resolve a child-index path; out-of-range paths read as `None`.
    pub fn at_path(&self, path: &[usize]) -> Option<&Frame> {
        let mut frame = self;
        for &index in path {
            frame = frame.children.get(index)?;
        }
        Some(frame)
    }
}

/// Scroll offsets surviving across rebuilds, keyed by `scroll_key` prop,
/// falling back to the node's stable key, else its path.
#[derive(Clone, Debug, Default)]
pub struct ScrollOffsets {
    offsets: HashMap<String, f32>,
}

impl ScrollOffsets {
    pub fn get(&self, key: &str) -> f32 {
        self.offsets.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: impl Into<String>, offset: f32) {
        self.offsets.insert(key.into(), offset);
    }
}

/// The identity a scroll container's offset persists under.
pub fn scroll_state_key(node: &Node, path: &[usize]) -> String {
    if let Some(key) = node.prop_str("scroll_key") {
        return key.to_owned();
    }
    if let Some(key) = node.stable_key() {
        return key.to_owned();
    }
    let mut key = String::from("@");
    for index in path {
        key.push('/');
        key.push_str(&index.to_string());
    }
    key
}
