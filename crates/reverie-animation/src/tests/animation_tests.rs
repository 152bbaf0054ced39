use super::*;
use reverie_core::diff;
use reverie_layout::{layout_tree, NoLeaves, ScrollOffsets};
use reverie_core::Size;
use std::time::Duration;

fn frames_for(tree: &Node) -> Frame {
    layout_tree(
        tree,
        Size::new(400.0, 400.0),
        &NoLeaves,
        &ScrollOffsets::default(),
    )
}

fn seed(
    old: &Node,
    new: &mut Node,
    override_spec: Option<AnimationSpec>,
    now: Instant,
) -> Vec<PropertyAnimation> {
    let old_frames = frames_for(old);
    let new_frames = frames_for(new);
    let patches = diff(old, new);
    seed_animations(&patches, old, &old_frames, new, &new_frames, override_spec, now)
}

#[test]
fn blend_color_hits_exact_endpoints() {
    let from = 0xFF202020;
    let to = 0xFF2D6BFF;
    assert_eq!(blend_color(from, to, 0.0), from);
    assert_eq!(blend_color(from, to, 1.0), to);
    // Midpoint blends channel-wise: 0x20..0x2D -> 0x27 (rounded).
    let mid = blend_color(from, to, 0.5);
    assert_eq!((mid >> 24) & 0xFF, 0xFF);
    assert_eq!((mid >> 16) & 0xFF, 0x27);
}

#[test]
fn non_numeric_values_jump_to_target() {
    let out = interpolate(
        "opacity",
        &Value::Str("a".into()),
        &Value::Str("b".into()),
        0.3,
    );
    assert_eq!(out, Value::Str("b".into()));
}

#[test]
fn int_pairs_interpolate_to_ints() {
    assert_eq!(
        interpolate("border_width", &Value::Int(0), &Value::Int(10), 0.25),
        Value::Int(3)
    );
}

#[test]
fn background_transition_resets_live_prop_and_converges() {
    let now = Instant::now();
    let old = Node::new("button").prop("animation", true).prop("bg", 0xFF202020u32);
    let mut new = Node::new("button")
        .prop("animation", true)
        .prop("animation_ms", 200i64)
        .prop("bg", 0xFF2D6BFFu32);

    let mut animations = seed(&old, &mut new, None, now);
    assert_eq!(animations.len(), 1);
    // Immediately after rebuild the live value shows the start state.
    assert_eq!(new.prop_i64("bg"), Some(0xFF202020u32 as i64));

    // Halfway: some blend strictly between the endpoints.
    step_animations(&mut new, &mut animations, now + Duration::from_millis(100));
    let mid = new.prop_i64("bg").unwrap();
    assert_ne!(mid, 0xFF202020u32 as i64);
    assert_ne!(mid, 0xFF2D6BFFu32 as i64);

    // At the full duration the value pins exactly and the record is gone.
    step_animations(&mut new, &mut animations, now + Duration::from_millis(200));
    assert_eq!(new.prop_i64("bg"), Some(0xFF2D6BFFu32 as i64));
    assert!(animations.is_empty());
}

#[test]
fn no_spec_means_no_animation() {
    let now = Instant::now();
    let old = Node::new("button").prop("bg", 0xFF202020u32);
    let mut new = Node::new("button").prop("bg", 0xFF2D6BFFu32);
    let animations = seed(&old, &mut new, None, now);
    assert!(animations.is_empty());
    // The live value stays at the target.
    assert_eq!(new.prop_i64("bg"), Some(0xFF2D6BFFu32 as i64));
}

#[test]
fn override_spec_wins_over_missing_declarations() {
    let now = Instant::now();
    let old = Node::new("button").prop("bg", 0xFF000000u32);
    let mut new = Node::new("button").prop("bg", 0xFFFFFFFFu32);
    let animations = seed(&old, &mut new, Some(AnimationSpec::millis(500)), now);
    assert_eq!(animations.len(), 1);
    assert_eq!(animations[0].spec.duration, Duration::from_millis(500));
}

#[test]
fn nearest_ancestor_spec_wins() {
    let now = Instant::now();
    let old = Node::new("column")
        .prop("animation", true)
        .prop("animation_ms", 900i64)
        .child(
            Node::new("row")
                .prop("animation", true)
                .prop("animation_ms", 150i64)
                .child(Node::new("button").prop("opacity", 1.0)),
        );
    let mut new = Node::new("column")
        .prop("animation", true)
        .prop("animation_ms", 900i64)
        .child(
            Node::new("row")
                .prop("animation", true)
                .prop("animation_ms", 150i64)
                .child(Node::new("button").prop("opacity", 0.2)),
        );
    let animations = seed(&old, &mut new, None, now);
    assert_eq!(animations.len(), 1);
    // The row is nearer than the column.
    assert_eq!(animations[0].spec.duration, Duration::from_millis(150));
}

#[test]
fn non_animatable_props_are_ignored() {
    let now = Instant::now();
    let old = Node::new("button").prop("animation", true).prop("label", "a");
    let mut new = Node::new("button").prop("animation", true).prop("label", "b");
    assert!(seed(&old, &mut new, None, now).is_empty());
}

#[test]
fn inserted_child_fades_in_when_opted_in() {
    let now = Instant::now();
    let old = Node::new("column").prop("animation", true);
    let mut new = Node::new("column").prop("animation", true).child(
        Node::new("toast")
            .prop("transition", "opacity")
            .prop("opacity", 0.9),
    );
    let mut animations = seed(&old, &mut new, None, now);
    assert_eq!(animations.len(), 1);
    assert_eq!(new.child_nodes()[0].prop_f32("opacity"), Some(0.0));

    step_animations(&mut new, &mut animations, now + Duration::from_millis(400));
    let opacity = new.child_nodes()[0].prop_f32("opacity").unwrap();
    assert!((opacity - 0.9).abs() < 1e-6);
    assert!(animations.is_empty());
}

#[test]
fn matched_geometry_glides_between_frames() {
    let now = Instant::now();
    // The tagged box moves from the first row slot to after a 60-wide
    // sibling.
    let old = Node::new("row").prop("animation", true).child(
        Node::new("box")
            .prop("match_ns", "cards")
            .prop("match_id", "a")
            .prop("width", 40.0)
            .prop("height", 40.0),
    );
    let mut new = Node::new("row")
        .prop("animation", true)
        .child(Node::new("box").prop("width", 60.0).prop("height", 40.0))
        .child(
            Node::new("box")
                .prop("match_ns", "cards")
                .prop("match_id", "a")
                .prop("width", 40.0)
                .prop("height", 40.0),
        );
    let mut animations = seed(&old, &mut new, None, now);
    let offsets: Vec<_> = animations
        .iter()
        .filter(|a| a.key.starts_with("offset_"))
        .collect();
    assert_eq!(offsets.len(), 2);

    // Start state: render offset carries the node back to its old frame.
    let moved = new.child_nodes()[1].clone();
    assert_eq!(moved.prop_f32("offset_x"), Some(-60.0));
    assert_eq!(moved.prop_f32("offset_y"), Some(0.0));

    // Convergence: offsets land on zero and records drain.
    step_animations(&mut new, &mut animations, now + Duration::from_secs(1));
    let settled = &new.child_nodes()[1];
    assert_eq!(settled.prop_f32("offset_x"), Some(0.0));
    assert!(animations.iter().all(|a| !a.key.starts_with("offset_")));
}

#[test]
fn delay_holds_the_start_value() {
    let now = Instant::now();
    let mut tree = Node::new("button").prop("opacity", 0.0);
    let mut animations = vec![PropertyAnimation {
        path: vec![],
        key: "opacity".into(),
        from: Value::Float(0.0),
        to: Value::Float(1.0),
        start: now,
        spec: AnimationSpec::millis(100).with_delay(Duration::from_millis(50)),
    }];
    step_animations(&mut tree, &mut animations, now + Duration::from_millis(30));
    assert_eq!(tree.prop_f32("opacity"), Some(0.0));
    step_animations(&mut tree, &mut animations, now + Duration::from_millis(150));
    assert_eq!(tree.prop_f32("opacity"), Some(1.0));
    assert!(animations.is_empty());
}

#[test]
fn stale_paths_drop_records_softly() {
    let now = Instant::now();
    let mut tree = Node::new("column");
    let mut animations = vec![PropertyAnimation {
        path: vec![3],
        key: "opacity".into(),
        from: Value::Float(0.0),
        to: Value::Float(1.0),
        start: now,
        spec: AnimationSpec::millis(100),
    }];
    let changed = step_animations(&mut tree, &mut animations, now + Duration::from_millis(10));
    assert!(!changed);
    assert!(animations.is_empty());
}

#[test]
fn merge_replaces_colliding_records() {
    let now = Instant::now();
    let make = |key: &str, to: f64| PropertyAnimation {
        path: vec![0],
        key: key.into(),
        from: Value::Float(0.0),
        to: Value::Float(to),
        start: now,
        spec: AnimationSpec::millis(100),
    };
    let mut active = vec![make("opacity", 1.0), make("offset_x", 5.0)];
    merge_animations(&mut active, vec![make("opacity", 0.5)]);
    assert_eq!(active.len(), 2);
    let opacity = active.iter().find(|a| a.key == "opacity").unwrap();
    assert_eq!(opacity.to, Value::Float(0.5));
}
