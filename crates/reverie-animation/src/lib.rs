//! Property-level animation scheduling.
//!
//! Animations are seeded exclusively from the patch list a rebuild
//! produced, then replayed by cheap per-frame property mutations until
//! each record converges on its target. Stepping never triggers a rebuild.

use std::time::Instant;

use ahash::AHashMap;
use reverie_core::{AnimationSpec, Curve, Node, PatchOp, Rect, Value};
use reverie_layout::Frame;

/// Property keys eligible for transition animation.
pub const ANIMATABLE_PROPS: &[&str] = &[
    "bg",
    "border_color",
    "fg",
    "opacity",
    "border_width",
    "offset_x",
    "offset_y",
];

/// Subset of animatable keys interpolated channel-wise as packed
/// 0xAARRGGBB colors.
pub const COLOR_PROPS: &[&str] = &["bg", "border_color", "fg"];

/// One in-flight property interpolation.
#[derive(Clone, Debug)]
pub struct PropertyAnimation {
    pub path: Vec<usize>,
    pub key: String,
    pub from: Value,
    pub to: Value,
    pub start: Instant,
    pub spec: AnimationSpec,
}

impl PropertyAnimation {
    /// Local progress in [0, 1]; zero duration jumps straight to done.
    fn progress(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start);
        let active = elapsed.saturating_sub(self.spec.delay);
        if self.spec.duration.is_zero() {
            return 1.0;
        }
        (active.as_secs_f32() / self.spec.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

/// Seed the pending-animation list from one rebuild's patches.
///
/// `new_tree` is the freshly built tree; animated properties are reset to
/// their start values in place so the very next render frame shows the
/// start state while the records carry the targets.
pub fn seed_animations(
    patches: &[PatchOp],
    old_tree: &Node,
    old_frames: &Frame,
    new_tree: &mut Node,
    new_frames: &Frame,
    override_spec: Option<AnimationSpec>,
    now: Instant,
) -> Vec<PropertyAnimation> {
    let mut animations = Vec::new();

    for patch in patches {
        match patch {
            PatchOp::SetProp { path, name, value } => {
                if !ANIMATABLE_PROPS.contains(&name.as_str()) {
                    continue;
                }
                let Some(from) = old_tree
                    .node_at(path)
                    .ok()
                    .and_then(|node| node.get_prop(name))
                    .cloned()
                else {
                    continue;
                };
                if !from.is_numeric() || !value.is_numeric() {
                    continue;
                }
                let Some(spec) = spec_for(new_tree, path, override_spec) else {
                    continue;
                };
                if let Ok(node) = new_tree.node_at_mut(path) {
                    node.set_prop(name.clone(), from.clone());
                }
                animations.push(PropertyAnimation {
                    path: path.clone(),
                    key: name.clone(),
                    from,
                    to: value.clone(),
                    start: now,
                    spec,
                });
            }
            PatchOp::InsertChild { path, node } => {
                if node.prop_str("transition") != Some("opacity") {
                    continue;
                }
                let Some(spec) = spec_for(new_tree, path, override_spec) else {
                    continue;
                };
                let target = node.prop_f32("opacity").unwrap_or(1.0);
                if let Ok(inserted) = new_tree.node_at_mut(path) {
                    inserted.set_prop("opacity", 0.0f64);
                }
                animations.push(PropertyAnimation {
                    path: path.clone(),
                    key: "opacity".into(),
                    from: Value::Float(0.0),
                    to: Value::Float(f64::from(target)),
                    start: now,
                    spec,
                });
            }
            _ => {}
        }
    }

    animations.extend(seed_matched_geometry(
        old_tree,
        old_frames,
        new_tree,
        new_frames,
        override_spec,
        now,
    ));
    animations
}

/// Nodes tagged with a (namespace, id) pair are matched across the old and
/// new frame trees by that tag; a moved frame seeds two render-offset
/// records so the node glides from its old frame while layout already
/// reports the new one.
fn seed_matched_geometry(
    old_tree: &Node,
    old_frames: &Frame,
    new_tree: &mut Node,
    new_frames: &Frame,
    override_spec: Option<AnimationSpec>,
    now: Instant,
) -> Vec<PropertyAnimation> {
    let old_tags = collect_match_tags(old_tree, old_frames);
    if old_tags.is_empty() {
        return Vec::new();
    }
    let new_tags = collect_match_tags(new_tree, new_frames);

    let mut animations = Vec::new();
    for (tag, (path, new_rect)) in new_tags {
        let Some((_, old_rect)) = old_tags.get(&tag) else {
            continue;
        };
        let dx = old_rect.x - new_rect.x;
        let dy = old_rect.y - new_rect.y;
        if dx == 0.0 && dy == 0.0 {
            continue;
        }
        let Some(spec) = spec_for(new_tree, &path, override_spec) else {
            continue;
        };
        if let Ok(node) = new_tree.node_at_mut(&path) {
            node.set_prop("offset_x", f64::from(dx));
            node.set_prop("offset_y", f64::from(dy));
        }
        for (key, delta) in [("offset_x", dx), ("offset_y", dy)] {
            animations.push(PropertyAnimation {
                path: path.clone(),
                key: key.into(),
                from: Value::Float(f64::from(delta)),
                to: Value::Float(0.0),
                start: now,
                spec,
            });
        }
    }
    animations
}

type TagMap = AHashMap<(String, String), (Vec<usize>, Rect)>;

fn collect_match_tags(tree: &Node, frames: &Frame) -> TagMap {
    fn walk(node: &Node, frame: &Frame, path: &mut Vec<usize>, tags: &mut TagMap) {
        if let (Some(ns), Some(id)) = (node.prop_str("match_ns"), node.prop_str("match_id")) {
            tags.insert(
                (ns.to_owned(), id.to_owned()),
                (path.clone(), frame.rect),
            );
        }
        for (index, (child, child_frame)) in
            node.child_nodes().iter().zip(&frame.children).enumerate()
        {
            path.push(index);
            walk(child, child_frame, path, tags);
            path.pop();
        }
    }
    let mut tags = TagMap::default();
    let mut path = Vec::new();
    walk(tree, frames, &mut path, &mut tags);
    tags
}

/// The spec governing an animation at `path`: an explicit override wins,
/// otherwise the nearest ancestor (the node itself included) that declares
/// `animation = true`.
fn spec_for(
    tree: &Node,
    path: &[usize],
    override_spec: Option<AnimationSpec>,
) -> Option<AnimationSpec> {
    if let Some(spec) = override_spec {
        return Some(spec);
    }
    for depth in (0..=path.len()).rev() {
        let Ok(node) = tree.node_at(&path[..depth]) else {
            continue;
        };
        if node.prop_bool("animation") == Some(true) {
            return Some(node_spec(node));
        }
    }
    None
}

fn node_spec(node: &Node) -> AnimationSpec {
    let mut spec = AnimationSpec::millis(node.prop_i64("animation_ms").unwrap_or(200).max(0) as u64);
    if let Some(delay) = node.prop_i64("animation_delay_ms") {
        spec = spec.with_delay(std::time::Duration::from_millis(delay.max(0) as u64));
    }
    if let Some(curve) = node.prop_str("animation_curve") {
        spec = spec.with_curve(Curve::from_name(curve));
    }
    spec
}

/// Replace active records that a fresh seeding supersedes (same path and
/// property) and append the new ones.
pub fn merge_animations(active: &mut Vec<PropertyAnimation>, fresh: Vec<PropertyAnimation>) {
    active.retain(|animation| {
        !fresh
            .iter()
            .any(|new| new.path == animation.path && new.key == animation.key)
    });
    active.extend(fresh);
}

/// Advance every record to `now`, writing interpolated values into the
/// tree. Records that reached their target are pinned to it exactly and
/// dropped; records whose path no longer resolves are dropped softly.
/// Returns whether any property changed.
pub fn step_animations(
    tree: &mut Node,
    animations: &mut Vec<PropertyAnimation>,
    now: Instant,
) -> bool {
    let mut changed = false;
    animations.retain(|animation| {
        let t = animation.progress(now);
        let value = if t >= 1.0 {
            animation.to.clone()
        } else {
            interpolate(&animation.key, &animation.from, &animation.to, t)
        };
        match tree.node_at_mut(&animation.path) {
            Ok(node) => {
                node.set_prop(animation.key.clone(), value);
                changed = true;
                t < 1.0
            }
            Err(_) => {
                log::debug!(
                    "dropping animation for {:?} at stale path {:?}",
                    animation.key,
                    animation.path
                );
                false
            }
        }
    });
    changed
}

/// Linear interpolation between two property values: colors blend
/// channel-wise in 8-bit space, scalars lerp, anything else jumps to the
/// target.
pub fn interpolate(key: &str, from: &Value, to: &Value, t: f32) -> Value {
    if COLOR_PROPS.contains(&key) {
        if let (Some(a), Some(b)) = (from.as_i64(), to.as_i64()) {
            return Value::Int(blend_color(a as u32, b as u32, t) as i64);
        }
    }
    match (from.as_f64(), to.as_f64()) {
        (Some(a), Some(b)) => {
            let mixed = a + (b - a) * f64::from(t);
            match (from, to) {
                (Value::Int(_), Value::Int(_)) => Value::Int(mixed.round() as i64),
                _ => Value::Float(mixed),
            }
        }
        _ => to.clone(),
    }
}

/// Channel-wise blend of two packed 0xAARRGGBB colors, rounded and clamped
/// per 8-bit channel.
pub fn blend_color(from: u32, to: u32, t: f32) -> u32 {
    let mut out = 0u32;
    for shift in [24, 16, 8, 0] {
        let a = ((from >> shift) & 0xFF) as f32;
        let b = ((to >> shift) & 0xFF) as f32;
        let mixed = (a + (b - a) * t).round().clamp(0.0, 255.0) as u32;
        out |= mixed << shift;
    }
    out
}

#[cfg(test)]
#[path = "tests/animation_tests.rs"]
mod tests;
