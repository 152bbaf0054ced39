//! `ViewInstance`: the single logical owner of a view's tree, frames,
//! handlers, animations, captures and focus.
//!
//! The host drives it with `update(now)` once per tick and feeds input
//! through `dispatch`. A rebuild runs only when a dependency read by the
//! last build has changed (or the host invalidated the instance); animation
//! stepping and scroll relayouts re-emit render ops without rebuilding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use reverie_animation::{merge_animations, seed_animations, step_animations, PropertyAnimation};
use reverie_core::{
    apply_styles, diff, flatten_groups, normalize_tree, AnimationSpec, BuildContext,
    DependencySet, DispatchContext, EnvTable, Event, HandlerId, HandlerMap, LocalStateTable,
    Node, Size, StyleRule, TargetRef,
};
use reverie_input::{DispatchOutcome, EventDispatcher};
use reverie_layout::{layout_tree, Frame, ScrollOffsets};
use reverie_render::{emit_scene, Component, ComponentRegistry, RenderOp};

/// Upper bound on "measure, resolve size-dependent content, measure again"
/// iterations within one rebuild. Content that keeps producing unresolved
/// readers past this point is left as-is.
const MAX_DEFERRED_PASSES: usize = 8;

/// What one `update` call did, for the host's redraw decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub rebuilt: bool,
    pub redrew: bool,
}

/// Orchestrates one view: owns the current node tree, the parallel frame
/// tree, the render-op list, the dependency set of the last build, active
/// animations, and the dispatcher's capture/focus targets.
pub struct ViewInstance {
    builder: Box<dyn FnMut(&mut BuildContext<'_>) -> Node>,
    registry: ComponentRegistry,
    styles: Vec<StyleRule>,
    env: EnvTable,
    locals: LocalStateTable,
    next_handler_id: HandlerId,
    handlers: HandlerMap,
    deps: DependencySet,
    dirty: Arc<AtomicBool>,
    tree: Option<Node>,
    frames: Frame,
    ops: Vec<RenderOp>,
    animations: Vec<PropertyAnimation>,
    scroll: ScrollOffsets,
    dispatcher: EventDispatcher,
    pending_override: Option<AnimationSpec>,
    viewport: Size,
    needs_layout: bool,
}

impl ViewInstance {
    pub fn new(
        viewport: Size,
        builder: impl FnMut(&mut BuildContext<'_>) -> Node + 'static,
    ) -> Self {
        Self {
            builder: Box::new(builder),
            registry: ComponentRegistry::new(),
            styles: Vec::new(),
            env: EnvTable::default(),
            locals: LocalStateTable::default(),
            next_handler_id: 1,
            handlers: HandlerMap::new(),
            deps: DependencySet::default(),
            dirty: Arc::new(AtomicBool::new(true)),
            tree: None,
            frames: Frame::default(),
            ops: Vec::new(),
            animations: Vec::new(),
            scroll: ScrollOffsets::default(),
            dispatcher: EventDispatcher::new(),
            pending_override: None,
            viewport,
            needs_layout: false,
        }
    }

    pub fn register_component(
        &mut self,
        kind: impl Into<String>,
        component: impl Component + 'static,
    ) {
        self.registry.register(kind, component);
    }

    /// Replace the style rule list. Takes effect on the next rebuild.
    pub fn set_styles(&mut self, rules: Vec<StyleRule>) {
        self.styles = rules;
        self.dirty.store(true, Ordering::Release);
    }

    /// Environment values builders read via `ctx.env`. Entries added after
    /// the first build are seen by the next rebuild.
    pub fn env_mut(&mut self) -> &mut EnvTable {
        &mut self.env
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Resize the viewport. Size-dependent content has to be rebuilt, not
    /// just relaid out, so this invalidates the whole instance.
    pub fn set_viewport(&mut self, viewport: Size) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.dirty.store(true, Ordering::Release);
        }
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    pub fn frames(&self) -> &Frame {
        &self.frames
    }

    /// The render-op list from the most recent emission, in paint order.
    pub fn render_ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// In-flight property animations; a renderer may consult each record's
    /// curve identifier to remap progress.
    pub fn animations(&self) -> &[PropertyAnimation] {
        &self.animations
    }

    pub fn scroll_offsets(&self) -> &ScrollOffsets {
        &self.scroll
    }

    pub fn focus_target(&self) -> Option<&TargetRef> {
        self.dispatcher.focus_target()
    }

    /// Whether the next `update` has work to do: a stale dependency, a
    /// pending relayout, or animations still running.
    pub fn needs_frame(&self) -> bool {
        self.tree.is_none()
            || self.dirty.load(Ordering::Acquire)
            || self.deps.is_stale()
            || self.needs_layout
            || !self.animations.is_empty()
    }

    /// One host tick: rebuild if a read dependency changed, otherwise
    /// relayout if a scroll offset moved, otherwise step animations. Each
    /// path ends with a render-op re-emission; a quiet tick does nothing.
    pub fn update(&mut self, now: Instant) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        if self.tree.is_none() || self.dirty.swap(false, Ordering::AcqRel) || self.deps.is_stale()
        {
            self.rebuild(now);
            outcome.rebuilt = true;
            outcome.redrew = true;
        } else if self.needs_layout {
            self.relayout();
            self.emit();
            outcome.redrew = true;
        } else if !self.animations.is_empty() {
            let stepped = match self.tree.as_mut() {
                Some(tree) => step_animations(tree, &mut self.animations, now),
                None => false,
            };
            if stepped {
                self.emit();
                outcome.redrew = true;
            }
        }
        outcome
    }

    /// Route one input event onto the current tree. Scroll mutations mark
    /// the instance for relayout on the next `update`; state mutations from
    /// handlers mark it dirty through their subscriptions.
    pub fn dispatch(&mut self, event: &Event) -> DispatchOutcome {
        let Some(tree) = self.tree.as_ref() else {
            return DispatchOutcome::default();
        };
        let mut ctx = DispatchContext::new();
        let outcome = self.dispatcher.dispatch(
            event,
            tree,
            &self.frames,
            &mut self.scroll,
            &self.handlers,
            &mut ctx,
        );
        if let Some(spec) = ctx.take_animation_override() {
            self.pending_override = Some(spec);
        }
        if outcome.scroll_changed {
            self.needs_layout = true;
        }
        outcome
    }

    fn rebuild(&mut self, now: Instant) {
        self.dirty.store(false, Ordering::Release);

        let mut ctx = BuildContext::new(&mut self.next_handler_id, &mut self.locals, &self.env);
        let raw = (self.builder)(&mut ctx);
        let flag = Arc::clone(&self.dirty);
        let (deps, handlers) = ctx.finish(move || flag.store(true, Ordering::Release));
        self.deps = deps;
        self.handlers = handlers;

        let mut tree = normalize_tree(raw);
        apply_styles(&mut tree, &self.styles);
        let frames = self.resolve_deferred(&mut tree);

        if let Some(old_tree) = self.tree.take() {
            let patches = diff(&old_tree, &tree);
            let fresh = seed_animations(
                &patches,
                &old_tree,
                &self.frames,
                &mut tree,
                &frames,
                self.pending_override.take(),
                now,
            );
            merge_animations(&mut self.animations, fresh);
        } else {
            self.pending_override = None;
        }

        // Seeding only touched paint-side properties, so the frame tree
        // computed before it is still valid.
        self.tree = Some(tree);
        self.frames = frames;
        self.needs_layout = false;
        self.emit();
    }

    /// Lay the tree out as far as it can go, hand every unresolved
    /// size-dependent content callback its resolved box, splice the result
    /// in, and repeat until nothing is pending (or the pass bound trips).
    fn resolve_deferred(&self, tree: &mut Node) -> Frame {
        let mut frames = layout_tree(tree, self.viewport, &self.registry, &self.scroll);
        for _ in 0..MAX_DEFERRED_PASSES {
            let pending = unresolved_deferred(tree);
            if pending.is_empty() {
                return frames;
            }
            for path in &pending {
                let size = frames
                    .at_path(path)
                    .map(|frame| frame.rect.size())
                    .unwrap_or(Size::ZERO);
                if let Ok(node) = tree.node_at_mut(path) {
                    if let Some(content) = node.deferred_content_mut() {
                        let children = content.resolve(size);
                        *node.child_nodes_mut() = children;
                        flatten_groups(node);
                    }
                }
            }
            // Spliced subtrees pick up style fills too; refilling already
            // styled nodes is a no-op.
            apply_styles(tree, &self.styles);
            frames = layout_tree(tree, self.viewport, &self.registry, &self.scroll);
        }
        if !unresolved_deferred(tree).is_empty() {
            log::debug!("size-dependent content still unresolved after {MAX_DEFERRED_PASSES} passes");
        }
        frames
    }

    fn relayout(&mut self) {
        if let Some(tree) = self.tree.as_ref() {
            self.frames = layout_tree(tree, self.viewport, &self.registry, &self.scroll);
        }
        self.needs_layout = false;
    }

    fn emit(&mut self) {
        if let Some(tree) = self.tree.as_ref() {
            self.ops = emit_scene(tree, &self.frames, &self.registry);
        }
    }
}

/// Paths of nodes whose size-dependent content has not produced children
/// yet, in document order.
fn unresolved_deferred(tree: &Node) -> Vec<Vec<usize>> {
    fn walk(node: &Node, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if node
            .deferred_content()
            .is_some_and(|content| !content.is_resolved())
        {
            out.push(path.clone());
        }
        for (index, child) in node.child_nodes().iter().enumerate() {
            path.push(index);
            walk(child, path, out);
            path.pop();
        }
    }
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(tree, &mut path, &mut out);
    out
}

#[cfg(test)]
#[path = "tests/instance_tests.rs"]
mod tests;
