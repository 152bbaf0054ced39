//! The seam between the runtime and leaf components / render backends: an
//! ordered render-op list emitted by walking the node and frame trees in
//! lockstep.
//!
//! The walk interprets only type-agnostic properties (background, border,
//! opacity, render offsets, clipping); everything node-type-specific comes
//! from the registered component for that type tag.

use hashbrown::HashMap;

use reverie_core::{Node, Rect, Size};
use reverie_layout::{Constraints, Frame, LeafMeasure, KIND_SCROLL};

/// One drawing command for the backend. Ops arrive in paint order; the
/// backend batches and rasterizes however it likes.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderOp {
    Rect {
        rect: Rect,
        color: u32,
        corner_radius: f32,
        border_color: u32,
        border_width: f32,
    },
    Text {
        rect: Rect,
        text: String,
        color: u32,
        size: f32,
    },
    Image {
        rect: Rect,
        source: String,
        opacity: f32,
    },
    PushClip {
        rect: Rect,
    },
    PopClip,
}

/// Contract a concrete leaf component (Button, Text, TextField, ...)
/// fulfills: desired size under constraints, and render ops for a resolved
/// frame.
pub trait Component {
    fn measure(&self, node: &Node, constraints: Constraints) -> Size;
    fn emit(&self, node: &Node, rect: Rect, out: &mut Vec<RenderOp>);
}

/// Leaf components keyed by node type tag. Unknown tags degrade to
/// container behavior in layout and emit nothing themselves.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Box<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, component: impl Component + 'static) {
        self.components.insert(kind.into(), Box::new(component));
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Component> {
        self.components.get(kind).map(|boxed| boxed.as_ref())
    }
}

impl LeafMeasure for ComponentRegistry {
    fn measure_leaf(&self, node: &Node, constraints: Constraints) -> Option<Size> {
        self.get(node.kind())
            .map(|component| component.measure(node, constraints))
    }
}

/// Walk the tree and emit the frame's ordered render-op list.
pub fn emit_scene(tree: &Node, frames: &Frame, registry: &ComponentRegistry) -> Vec<RenderOp> {
    let mut out = Vec::new();
    emit_node(tree, frames, registry, 1.0, 0.0, 0.0, &mut out);
    out
}

fn emit_node(
    node: &Node,
    frame: &Frame,
    registry: &ComponentRegistry,
    opacity: f32,
    dx: f32,
    dy: f32,
    out: &mut Vec<RenderOp>,
) {
    let opacity = opacity * node.prop_f32("opacity").unwrap_or(1.0).clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    // Render offsets glide the whole subtree; layout already reports the
    // settled frame.
    let dx = dx + node.prop_f32("offset_x").unwrap_or(0.0);
    let dy = dy + node.prop_f32("offset_y").unwrap_or(0.0);
    let rect = frame.rect.translate(dx, dy);

    if let Some(bg) = node.prop_i64("bg") {
        out.push(RenderOp::Rect {
            rect,
            color: apply_opacity(bg as u32, opacity),
            corner_radius: node.prop_f32("corner_radius").unwrap_or(0.0),
            border_color: node
                .prop_i64("border_color")
                .map(|color| apply_opacity(color as u32, opacity))
                .unwrap_or(0),
            border_width: node.prop_f32("border_width").unwrap_or(0.0),
        });
    }

    if let Some(component) = registry.get(node.kind()) {
        let mark = out.len();
        component.emit(node, rect, out);
        for op in &mut out[mark..] {
            scale_op_opacity(op, opacity);
        }
    }

    let clips = node.kind() == KIND_SCROLL || node.prop_bool("clip") == Some(true);
    if clips {
        out.push(RenderOp::PushClip { rect });
    }
    for (child, child_frame) in node.child_nodes().iter().zip(&frame.children) {
        emit_node(child, child_frame, registry, opacity, dx, dy, out);
    }
    if clips {
        out.push(RenderOp::PopClip);
    }
}

fn scale_op_opacity(op: &mut RenderOp, opacity: f32) {
    if opacity >= 1.0 {
        return;
    }
    match op {
        RenderOp::Rect {
            color,
            border_color,
            ..
        } => {
            *color = apply_opacity(*color, opacity);
            *border_color = apply_opacity(*border_color, opacity);
        }
        RenderOp::Text { color, .. } => *color = apply_opacity(*color, opacity),
        RenderOp::Image { opacity: op_opacity, .. } => *op_opacity *= opacity,
        RenderOp::PushClip { .. } | RenderOp::PopClip => {}
    }
}

/// Scale a packed 0xAARRGGBB color's alpha channel.
pub fn apply_opacity(color: u32, opacity: f32) -> u32 {
    if opacity >= 1.0 {
        return color;
    }
    let alpha = ((color >> 24) as f32 * opacity.clamp(0.0, 1.0)).round() as u32;
    (alpha << 24) | (color & 0x00FF_FFFF)
}

#[cfg(test)]
#[path = "tests/scene_tests.rs"]
mod tests;
