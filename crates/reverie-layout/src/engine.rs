//! Two-pass layout: measure bottom-up under box constraints, then arrange
//! top-down into absolute frames. Nothing is cached across frames; the
//! whole pass reruns whenever the tree or viewport changes.

use reverie_core::{Node, Rect, Size};

use crate::constraints::Constraints;
use crate::frame::{scroll_state_key, Frame, ScrollFrame, ScrollOffsets};
use crate::{KIND_COLUMN, KIND_GRID, KIND_ROW, KIND_SCROLL, KIND_SPACER};

/// Delegated measurement for leaf node types the engine does not know.
/// Returning `None` means "not mine"; the engine falls back to container
/// behavior over the node's children.
pub trait LeafMeasure {
    fn measure_leaf(&self, node: &Node, constraints: Constraints) -> Option<Size>;
}

/// A registry-free stand-in for trees made of containers only.
pub struct NoLeaves;

impl LeafMeasure for NoLeaves {
    fn measure_leaf(&self, _node: &Node, _constraints: Constraints) -> Option<Size> {
        None
    }
}

/// Measure sizes parallel to the node tree, consumed by the arrange pass.
struct Measured {
    size: Size,
    content_height: f32,
    children: Vec<Measured>,
}

impl Measured {
    fn leaf(size: Size) -> Self {
        Self {
            size,
            content_height: 0.0,
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn main(self, size: Size) -> f32 {
        match self {
            Axis::Horizontal => size.width,
            Axis::Vertical => size.height,
        }
    }

    fn cross(self, size: Size) -> f32 {
        match self {
            Axis::Horizontal => size.height,
            Axis::Vertical => size.width,
        }
    }

    fn pack(self, main: f32, cross: f32) -> Size {
        match self {
            Axis::Horizontal => Size::new(main, cross),
            Axis::Vertical => Size::new(cross, main),
        }
    }

    fn main_max(self, c: Constraints) -> f32 {
        match self {
            Axis::Horizontal => c.max_width,
            Axis::Vertical => c.max_height,
        }
    }

    fn cross_max(self, c: Constraints) -> f32 {
        match self {
            Axis::Horizontal => c.max_height,
            Axis::Vertical => c.max_width,
        }
    }

    fn loose(self, main_max: f32, cross_max: f32) -> Constraints {
        match self {
            Axis::Horizontal => Constraints::loose(main_max, cross_max),
            Axis::Vertical => Constraints::loose(cross_max, main_max),
        }
    }
}

/// Cross-axis (and stack) alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Alignment {
    #[default]
    Start,
    Center,
    End,
    Stretch,
}

impl Alignment {
    fn of(node: &Node) -> Self {
        match node.prop_str("align") {
            Some("center") => Alignment::Center,
            Some("end") => Alignment::End,
            Some("stretch") => Alignment::Stretch,
            _ => Alignment::Start,
        }
    }

    /// Offset and extent of a child within `available`, given its measured
    /// extent.
    fn place(self, measured: f32, available: f32) -> (f32, f32) {
        match self {
            Alignment::Start => (0.0, measured),
            Alignment::Center => (((available - measured) / 2.0).max(0.0), measured),
            Alignment::End => ((available - measured).max(0.0), measured),
            Alignment::Stretch => (0.0, available),
        }
    }
}

/// Lay out the whole tree against the viewport, producing the parallel
/// frame tree.
pub fn layout_tree(
    tree: &Node,
    viewport: Size,
    leaves: &dyn LeafMeasure,
    scroll: &ScrollOffsets,
) -> Frame {
    let constraints = Constraints::loose(viewport.width, viewport.height);
    let measured = measure_node(tree, constraints, leaves);
    let rect = Rect::new(0.0, 0.0, measured.size.width, measured.size.height);
    let mut path = Vec::new();
    arrange_node(tree, &measured, rect, scroll, &mut path)
}

fn padding_of(node: &Node) -> f32 {
    node.prop_f32("padding").unwrap_or(0.0).max(0.0)
}

fn spacing_of(node: &Node) -> f32 {
    node.prop_f32("spacing").unwrap_or(0.0).max(0.0)
}

/// An explicit width/height property pins the computed size to the
/// supplied value, never exceeding the incoming constraint.
fn apply_explicit_size(node: &Node, mut size: Size, c: Constraints) -> Size {
    if let Some(width) = node.prop_f32("width") {
        size.width = width.clamp(0.0, c.max_width);
    }
    if let Some(height) = node.prop_f32("height") {
        size.height = height.clamp(0.0, c.max_height);
    }
    size
}

fn measure_node(node: &Node, c: Constraints, leaves: &dyn LeafMeasure) -> Measured {
    let c = c.normalized();
    let mut measured = match node.kind() {
        KIND_ROW => measure_linear(node, c, leaves, Axis::Horizontal, false),
        KIND_COLUMN => measure_linear(node, c, leaves, Axis::Vertical, false),
        KIND_SCROLL => measure_linear(node, c, leaves, Axis::Vertical, true),
        KIND_GRID => measure_grid(node, c, leaves),
        KIND_SPACER => {
            let min = node.prop_f32("min_size").unwrap_or(0.0).max(0.0);
            Measured::leaf(Size::new(min, min))
        }
        _ => measure_other(node, c, leaves),
    };
    measured.size = c.constrain(apply_explicit_size(node, measured.size, c));
    measured
}

/// Row/column/scroll measurement: children see the inner box minus padding
/// and the main-axis space consumed so far; spacers split the remaining
/// free space evenly, honoring their own minimums.
fn measure_linear(
    node: &Node,
    c: Constraints,
    leaves: &dyn LeafMeasure,
    axis: Axis,
    unbounded_main: bool,
) -> Measured {
    let padding = padding_of(node);
    let spacing = spacing_of(node);
    let inner = c.deflate(padding);
    let inner_main = if unbounded_main {
        f32::INFINITY
    } else {
        axis.main_max(inner)
    };
    let inner_cross = axis.cross_max(inner);

    let children = node.child_nodes();
    let mut slots: Vec<Option<Measured>> = (0..children.len()).map(|_| None).collect();
    let mut spacers: Vec<(usize, f32)> = Vec::new();
    let mut consumed = 0.0_f32;

    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            consumed += spacing;
        }
        if child.kind() == KIND_SPACER {
            let min = child.prop_f32("min_size").unwrap_or(0.0).max(0.0);
            spacers.push((index, min));
            continue;
        }
        let remaining = (inner_main - consumed).max(0.0);
        let child_c = axis.loose(remaining, inner_cross);
        let child_measured = measure_node(child, child_c, leaves);
        consumed += axis.main(child_measured.size);
        slots[index] = Some(child_measured);
    }

    let free = if inner_main.is_finite() {
        (inner_main - consumed).max(0.0)
    } else {
        f32::INFINITY
    };
    let spacer_sizes = distribute_spacers(&spacers, free);
    for ((index, _), extent) in spacers.iter().zip(spacer_sizes) {
        consumed += extent;
        slots[*index] = Some(Measured::leaf(axis.pack(extent, 0.0)));
    }

    let measured_children: Vec<Measured> = slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Measured::leaf(Size::ZERO)))
        .collect();
    let cross = measured_children
        .iter()
        .fold(0.0_f32, |acc, m| acc.max(axis.cross(m.size)));

    let content_main = consumed + padding * 2.0;
    let size = axis.pack(content_main, cross + padding * 2.0);
    Measured {
        size,
        content_height: if axis == Axis::Vertical {
            content_main
        } else {
            0.0
        },
        children: measured_children,
    }
}

/// Split `free` among spacers. When the minimums alone overflow the free
/// space, each spacer shrinks to its minimum's share of that ratio instead
/// of overflowing.
fn distribute_spacers(spacers: &[(usize, f32)], free: f32) -> Vec<f32> {
    let count = spacers.len();
    if count == 0 {
        return Vec::new();
    }
    if !free.is_finite() {
        return spacers.iter().map(|(_, min)| *min).collect();
    }
    let total_min: f32 = spacers.iter().map(|(_, min)| min).sum();
    if total_min > free {
        if total_min <= 0.0 {
            return vec![0.0; count];
        }
        return spacers.iter().map(|(_, min)| free * min / total_min).collect();
    }

    let mut sizes = vec![0.0_f32; count];
    let mut pinned = vec![false; count];
    let mut remaining = free;
    let mut active = count;
    while active > 0 {
        let share = remaining / active as f32;
        let mut changed = false;
        for (i, (_, min)) in spacers.iter().enumerate() {
            if !pinned[i] && *min > share {
                sizes[i] = *min;
                pinned[i] = true;
                remaining -= *min;
                active -= 1;
                changed = true;
            }
        }
        if !changed {
            for (i, size) in sizes.iter_mut().enumerate() {
                if !pinned[i] {
                    *size = share;
                }
            }
            break;
        }
    }
    sizes
}

struct GridGeometry {
    tracks: usize,
    cell: f32,
    lines: Vec<f32>,
    row_major: bool,
}

fn grid_tracks(node: &Node) -> (usize, bool) {
    let row_major = node.prop_str("grid_axis") != Some("column");
    let tracks = node.prop_i64("columns").unwrap_or(1).max(1) as usize;
    (tracks, row_major)
}

/// Uniform cell extent along the constrained axis, content-driven line
/// extents along the free axis.
fn grid_geometry(
    node: &Node,
    measured: &[Measured],
    inner_main: f32,
    spacing: f32,
) -> GridGeometry {
    let (tracks, row_major) = grid_tracks(node);
    let cell = if inner_main.is_finite() {
        ((inner_main - spacing * (tracks - 1) as f32) / tracks as f32).max(0.0)
    } else {
        measured.iter().fold(0.0_f32, |acc, m| {
            acc.max(if row_major { m.size.width } else { m.size.height })
        })
    };
    let line_count = measured.len().div_ceil(tracks).max(1);
    let mut lines = vec![0.0_f32; line_count];
    for (index, child) in measured.iter().enumerate() {
        let line = index / tracks;
        let extent = if row_major {
            child.size.height
        } else {
            child.size.width
        };
        lines[line] = lines[line].max(extent);
    }
    GridGeometry {
        tracks,
        cell,
        lines,
        row_major,
    }
}

fn measure_grid(node: &Node, c: Constraints, leaves: &dyn LeafMeasure) -> Measured {
    let padding = padding_of(node);
    let spacing = spacing_of(node);
    let inner = c.deflate(padding);
    let (tracks, row_major) = grid_tracks(node);
    let inner_main = if row_major {
        inner.max_width
    } else {
        inner.max_height
    };
    let cell = if inner_main.is_finite() {
        ((inner_main - spacing * (tracks - 1) as f32) / tracks as f32).max(0.0)
    } else {
        f32::INFINITY
    };

    let measured_children: Vec<Measured> = node
        .child_nodes()
        .iter()
        .map(|child| {
            let child_c = if row_major {
                Constraints::loose(cell, f32::INFINITY)
            } else {
                Constraints::loose(f32::INFINITY, cell)
            };
            measure_node(child, child_c, leaves)
        })
        .collect();

    let geometry = grid_geometry(node, &measured_children, inner_main, spacing);
    let across = geometry.cell * geometry.tracks as f32
        + spacing * (geometry.tracks - 1) as f32;
    let along: f32 = geometry.lines.iter().sum::<f32>()
        + spacing * (geometry.lines.len().saturating_sub(1)) as f32;
    let size = if row_major {
        Size::new(across + padding * 2.0, along + padding * 2.0)
    } else {
        Size::new(along + padding * 2.0, across + padding * 2.0)
    };
    Measured {
        size,
        content_height: 0.0,
        children: measured_children,
    }
}

/// Everything else: overlay children inside the padded box; a registered
/// leaf component's own measurement wins over the children-derived size.
fn measure_other(node: &Node, c: Constraints, leaves: &dyn LeafMeasure) -> Measured {
    let padding = padding_of(node);
    let inner = c.deflate(padding);
    let measured_children: Vec<Measured> = node
        .child_nodes()
        .iter()
        .map(|child| measure_node(child, inner, leaves))
        .collect();
    let content = measured_children.iter().fold(Size::ZERO, |acc, m| {
        Size::new(acc.width.max(m.size.width), acc.height.max(m.size.height))
    });
    let size = match leaves.measure_leaf(node, c) {
        Some(leaf_size) => leaf_size,
        None => Size::new(content.width + padding * 2.0, content.height + padding * 2.0),
    };
    Measured {
        size,
        content_height: 0.0,
        children: measured_children,
    }
}

fn arrange_node(
    node: &Node,
    measured: &Measured,
    rect: Rect,
    scroll: &ScrollOffsets,
    path: &mut Vec<usize>,
) -> Frame {
    match node.kind() {
        KIND_ROW => arrange_linear(node, measured, rect, scroll, path, Axis::Horizontal, None),
        KIND_COLUMN => arrange_linear(node, measured, rect, scroll, path, Axis::Vertical, None),
        KIND_SCROLL => {
            let key = scroll_state_key(node, path);
            let content_height = measured.content_height;
            let max_offset = (content_height - rect.height).max(0.0);
            let offset = scroll.get(&key).clamp(0.0, max_offset);
            let scroll_frame = ScrollFrame {
                content_height,
                offset,
                max_offset,
            };
            arrange_linear(
                node,
                measured,
                rect,
                scroll,
                path,
                Axis::Vertical,
                Some(scroll_frame),
            )
        }
        KIND_GRID => arrange_grid(node, measured, rect, scroll, path),
        _ => arrange_other(node, measured, rect, scroll, path),
    }
}

fn arrange_linear(
    node: &Node,
    measured: &Measured,
    rect: Rect,
    scroll: &ScrollOffsets,
    path: &mut Vec<usize>,
    axis: Axis,
    scroll_frame: Option<ScrollFrame>,
) -> Frame {
    let padding = padding_of(node);
    let spacing = spacing_of(node);
    let alignment = Alignment::of(node);
    let inner_cross = (axis.cross(rect.size()) - padding * 2.0).max(0.0);

    let scroll_shift = scroll_frame.map(|s| s.offset).unwrap_or(0.0);
    let mut cursor = padding - if axis == Axis::Vertical { scroll_shift } else { 0.0 };
    let mut children = Vec::with_capacity(measured.children.len());
    for (index, (child, child_measured)) in node
        .child_nodes()
        .iter()
        .zip(&measured.children)
        .enumerate()
    {
        if index > 0 {
            cursor += spacing;
        }
        let main_extent = axis.main(child_measured.size);
        let (cross_offset, cross_extent) =
            alignment.place(axis.cross(child_measured.size), inner_cross);
        let child_rect = match axis {
            Axis::Horizontal => Rect::new(
                rect.x + cursor,
                rect.y + padding + cross_offset,
                main_extent,
                cross_extent,
            ),
            Axis::Vertical => Rect::new(
                rect.x + padding + cross_offset,
                rect.y + cursor,
                cross_extent,
                main_extent,
            ),
        };
        path.push(index);
        children.push(arrange_node(child, child_measured, child_rect, scroll, path));
        path.pop();
        cursor += main_extent;
    }

    Frame {
        rect,
        scroll: scroll_frame,
        children,
    }
}

fn arrange_grid(
    node: &Node,
    measured: &Measured,
    rect: Rect,
    scroll: &ScrollOffsets,
    path: &mut Vec<usize>,
) -> Frame {
    let padding = padding_of(node);
    let spacing = spacing_of(node);
    let inner_main = if grid_tracks(node).1 {
        (rect.width - padding * 2.0).max(0.0)
    } else {
        (rect.height - padding * 2.0).max(0.0)
    };
    let geometry = grid_geometry(node, &measured.children, inner_main, spacing);

    let mut line_starts = Vec::with_capacity(geometry.lines.len());
    let mut along = padding;
    for extent in &geometry.lines {
        line_starts.push(along);
        along += extent + spacing;
    }

    let mut children = Vec::with_capacity(measured.children.len());
    for (index, (child, child_measured)) in node
        .child_nodes()
        .iter()
        .zip(&measured.children)
        .enumerate()
    {
        let track = index % geometry.tracks;
        let line = index / geometry.tracks;
        let across = padding + track as f32 * (geometry.cell + spacing);
        let child_rect = if geometry.row_major {
            Rect::new(
                rect.x + across,
                rect.y + line_starts[line],
                child_measured.size.width,
                child_measured.size.height,
            )
        } else {
            Rect::new(
                rect.x + line_starts[line],
                rect.y + across,
                child_measured.size.width,
                child_measured.size.height,
            )
        };
        path.push(index);
        children.push(arrange_node(child, child_measured, child_rect, scroll, path));
        path.pop();
    }

    Frame {
        rect,
        scroll: None,
        children,
    }
}

fn arrange_other(
    node: &Node,
    measured: &Measured,
    rect: Rect,
    scroll: &ScrollOffsets,
    path: &mut Vec<usize>,
) -> Frame {
    let padding = padding_of(node);
    let alignment = Alignment::of(node);
    let inner_w = (rect.width - padding * 2.0).max(0.0);
    let inner_h = (rect.height - padding * 2.0).max(0.0);

    let mut children = Vec::with_capacity(measured.children.len());
    for (index, (child, child_measured)) in node
        .child_nodes()
        .iter()
        .zip(&measured.children)
        .enumerate()
    {
        let (dx, width) = alignment.place(child_measured.size.width, inner_w);
        let (dy, height) = alignment.place(child_measured.size.height, inner_h);
        let child_rect = Rect::new(rect.x + padding + dx, rect.y + padding + dy, width, height);
        path.push(index);
        children.push(arrange_node(child, child_measured, child_rect, scroll, path));
        path.pop();
    }

    Frame {
        rect,
        scroll: None,
        children,
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
