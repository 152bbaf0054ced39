//! The per-pointer dispatch state machine: idle → down → (optionally)
//! dragging-scroll → up, with capture short-circuiting hit-testing and
//! keyboard/text events routed to the focus target.
//!
//! Every cross-frame reference here is a `TargetRef` re-resolved on each
//! access; a target whose key died is dropped silently, never an error.

use hashbrown::HashMap;

use reverie_core::{
    DispatchCommand, DispatchContext, Event, HandlerMap, Node, PointerId, TargetRef,
};
use reverie_layout::{scroll_state_key, Frame, ScrollOffsets, KIND_SCROLL};

use crate::hit::hit_test;

/// Movement (in either axis direction) beyond which a press inside a
/// scroll container becomes a drag rather than a tap.
const DRAG_THRESHOLD: f32 = 4.0;

/// What a dispatch call did, for the host's redraw decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
    pub scroll_changed: bool,
}

#[derive(Clone, Debug)]
struct ScrollDrag {
    target: TargetRef,
    start: (f32, f32),
    last_y: f32,
    active: bool,
}

#[derive(Clone, Debug, Default)]
struct PointerState {
    capture: Option<TargetRef>,
    drag: Option<ScrollDrag>,
    down: Option<TargetRef>,
}

/// Routes host events onto the tree, owning capture and focus targets.
#[derive(Default)]
pub struct EventDispatcher {
    pointers: HashMap<PointerId, PointerState>,
    focus: Option<TargetRef>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus_target(&self) -> Option<&TargetRef> {
        self.focus.as_ref()
    }

    pub fn capture_target(&self, pointer: PointerId) -> Option<&TargetRef> {
        self.pointers
            .get(&pointer)
            .and_then(|state| state.capture.as_ref())
    }

    pub fn dispatch(
        &mut self,
        event: &Event,
        tree: &Node,
        frames: &Frame,
        scroll: &mut ScrollOffsets,
        handlers: &HandlerMap,
        ctx: &mut DispatchContext,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        match event {
            Event::PointerDown { pointer, x, y } => {
                self.on_pointer_down(*pointer, *x, *y, tree, frames, handlers, ctx, &mut outcome);
            }
            Event::PointerMove { pointer, x, y } => {
                self.on_pointer_move(
                    *pointer,
                    *x,
                    *y,
                    tree,
                    frames,
                    scroll,
                    handlers,
                    ctx,
                    &mut outcome,
                );
            }
            Event::PointerUp { pointer, x, y } => {
                self.on_pointer_up(*pointer, *x, *y, tree, frames, handlers, ctx, &mut outcome);
            }
            Event::Scroll { x, y, delta_y, .. } => {
                if let Some(path) = hit_test(tree, frames, *x, *y) {
                    if let Some(container) = nearest_scroll_ancestor(tree, &path) {
                        outcome.scroll_changed =
                            adjust_scroll(tree, frames, scroll, &container, *delta_y);
                        outcome.handled = true;
                    } else {
                        outcome.handled = bubble(event, &path, tree, handlers, ctx);
                    }
                }
            }
            Event::KeyDown { .. } | Event::TextInput { .. } | Event::Focus | Event::Blur => {
                // Routed only to the focused path; dropped when nothing is
                // focused or the focus key died.
                match self.resolve_focus(tree) {
                    Some(path) => {
                        outcome.handled = bubble(event, &path, tree, handlers, ctx);
                    }
                    None => {
                        log::trace!("dropping {:?}: no focus target", event.name());
                    }
                }
            }
            Event::Click { pointer: _, x, y } => {
                if let Some(path) = hit_test(tree, frames, *x, *y) {
                    outcome.handled = bubble(event, &path, tree, handlers, ctx);
                }
            }
        }
        self.process_commands(tree, handlers, ctx);
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn on_pointer_down(
        &mut self,
        pointer: PointerId,
        x: f32,
        y: f32,
        tree: &Node,
        frames: &Frame,
        handlers: &HandlerMap,
        ctx: &mut DispatchContext,
        outcome: &mut DispatchOutcome,
    ) {
        let Some(path) = hit_test(tree, frames, x, y) else {
            return;
        };

        let new_focus = nearest_focusable_ancestor(tree, &path)
            .map(|focus_path| TargetRef::capture(tree, &focus_path));
        self.change_focus(new_focus, tree, handlers, ctx);

        let state = self.pointers.entry(pointer).or_default();
        state.down = Some(TargetRef::capture(tree, &path));
        state.drag = nearest_scroll_ancestor(tree, &path).map(|scroll_path| ScrollDrag {
            target: TargetRef::capture(tree, &scroll_path),
            start: (x, y),
            last_y: y,
            active: false,
        });

        outcome.handled = bubble(
            &Event::PointerDown { pointer, x, y },
            &path,
            tree,
            handlers,
            ctx,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn on_pointer_move(
        &mut self,
        pointer: PointerId,
        x: f32,
        y: f32,
        tree: &Node,
        frames: &Frame,
        scroll: &mut ScrollOffsets,
        handlers: &HandlerMap,
        ctx: &mut DispatchContext,
        outcome: &mut DispatchOutcome,
    ) {
        let state = self.pointers.entry(pointer).or_default();

        enum DragStep {
            Idle,
            Scrolled(Vec<usize>, f32),
            Stale,
        }
        let step = match &mut state.drag {
            Some(drag) if drag.active => {
                let delta = drag.last_y - y;
                drag.last_y = y;
                match drag.target.resolve(tree) {
                    Some(container) => DragStep::Scrolled(container, delta),
                    None => DragStep::Stale,
                }
            }
            Some(drag) => {
                let dx = x - drag.start.0;
                let dy = y - drag.start.1;
                if dx.abs() > DRAG_THRESHOLD || dy.abs() > DRAG_THRESHOLD {
                    drag.active = true;
                    drag.last_y = y;
                    state.capture = Some(drag.target.clone());
                }
                DragStep::Idle
            }
            None => DragStep::Idle,
        };
        match step {
            DragStep::Scrolled(container, delta) => {
                outcome.scroll_changed = adjust_scroll(tree, frames, scroll, &container, delta);
                outcome.handled = true;
                return;
            }
            DragStep::Stale => {
                // The scroll container left the tree mid-drag.
                state.drag = None;
                state.capture = None;
            }
            DragStep::Idle => {}
        }

        let event = Event::PointerMove { pointer, x, y };
        if let Some(capture) = state.capture.clone() {
            match capture.resolve(tree) {
                Some(path) => {
                    outcome.handled = bubble(&event, &path, tree, handlers, ctx);
                    return;
                }
                None => {
                    log::debug!("dropping stale pointer capture for {pointer}");
                    state.capture = None;
                }
            }
        }
        if let Some(path) = hit_test(tree, frames, x, y) {
            outcome.handled = bubble(&event, &path, tree, handlers, ctx);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_pointer_up(
        &mut self,
        pointer: PointerId,
        x: f32,
        y: f32,
        tree: &Node,
        frames: &Frame,
        handlers: &HandlerMap,
        ctx: &mut DispatchContext,
        outcome: &mut DispatchOutcome,
    ) {
        let state = self.pointers.remove(&pointer).unwrap_or_default();

        let event = Event::PointerUp { pointer, x, y };
        let up_path = state
            .capture
            .as_ref()
            .and_then(|capture| capture.resolve(tree))
            .or_else(|| hit_test(tree, frames, x, y));
        if let Some(path) = &up_path {
            outcome.handled = bubble(&event, path, tree, handlers, ctx);
        }

        let drag_activated = state.drag.as_ref().is_some_and(|drag| drag.active);
        if !drag_activated {
            if let Some(down_path) = state.down.as_ref().and_then(|down| down.resolve(tree)) {
                let click = Event::Click { pointer, x, y };
                outcome.handled |= bubble(&click, &down_path, tree, handlers, ctx);
            }
        }
    }

    /// Move keyboard focus, firing `blur` on the previous target then
    /// `focus` on the new one, each bubbling from its own path.
    fn change_focus(
        &mut self,
        new_focus: Option<TargetRef>,
        tree: &Node,
        handlers: &HandlerMap,
        ctx: &mut DispatchContext,
    ) {
        let old_path = self.resolve_focus(tree);
        let new_path = new_focus.as_ref().and_then(|target| target.resolve(tree));
        if old_path == new_path {
            return;
        }
        if let Some(path) = old_path {
            bubble(&Event::Blur, &path, tree, handlers, ctx);
        }
        if let Some(path) = &new_path {
            bubble(&Event::Focus, path, tree, handlers, ctx);
        }
        self.focus = new_path.is_some().then_some(new_focus).flatten();
    }

    /// The focused path right now; a stale focus key silently clears the
    /// focus target.
    fn resolve_focus(&mut self, tree: &Node) -> Option<Vec<usize>> {
        let target = self.focus.as_ref()?;
        match target.resolve(tree) {
            Some(path) => Some(path),
            None => {
                self.focus = None;
                None
            }
        }
    }

    /// Apply capture/focus side effects handlers requested.
    fn process_commands(&mut self, tree: &Node, handlers: &HandlerMap, ctx: &mut DispatchContext) {
        for command in ctx.drain_commands() {
            match command {
                DispatchCommand::Capture { pointer, target } => {
                    self.pointers.entry(pointer).or_default().capture = Some(target);
                }
                DispatchCommand::ReleaseCapture { pointer } => {
                    if let Some(state) = self.pointers.get_mut(&pointer) {
                        state.capture = None;
                        state.drag = None;
                    }
                }
                DispatchCommand::RequestFocus { target } => {
                    self.change_focus(Some(target), tree, handlers, ctx);
                }
                DispatchCommand::ClearFocus => {
                    self.change_focus(None, tree, handlers, ctx);
                }
            }
        }
    }
}

/// Bubble `event` up the ancestor chain from `path`: the first node with a
/// registered handler for the event name wins, then bubbling stops. Stale
/// handler ids read as "no handler".
fn bubble(
    event: &Event,
    path: &[usize],
    tree: &Node,
    handlers: &HandlerMap,
    ctx: &mut DispatchContext,
) -> bool {
    for depth in (0..=path.len()).rev() {
        let prefix = &path[..depth];
        let Ok(node) = tree.node_at(prefix) else {
            continue;
        };
        let Some(handler_id) = node.handler_for(event.name()) else {
            continue;
        };
        let Some(handler) = handlers.get(&handler_id).cloned() else {
            continue;
        };
        ctx.set_current_target(Some(TargetRef::capture(tree, prefix)));
        handler(ctx, event);
        ctx.set_current_target(None);
        return true;
    }
    false
}

/// Deepest prefix of `path` (the node itself included) that is a scroll
/// container.
fn nearest_scroll_ancestor(tree: &Node, path: &[usize]) -> Option<Vec<usize>> {
    for depth in (0..=path.len()).rev() {
        if let Ok(node) = tree.node_at(&path[..depth]) {
            if node.kind() == KIND_SCROLL {
                return Some(path[..depth].to_vec());
            }
        }
    }
    None
}

/// Deepest prefix of `path` carrying `focusable = true`.
fn nearest_focusable_ancestor(tree: &Node, path: &[usize]) -> Option<Vec<usize>> {
    for depth in (0..=path.len()).rev() {
        if let Ok(node) = tree.node_at(&path[..depth]) {
            if node.prop_bool("focusable") == Some(true) {
                return Some(path[..depth].to_vec());
            }
        }
    }
    None
}

/// Apply a wheel/drag delta to a scroll container's offset, clamped to
/// `[0, max_offset]`. Returns whether the offset moved.
fn adjust_scroll(
    tree: &Node,
    frames: &Frame,
    scroll: &mut ScrollOffsets,
    path: &[usize],
    delta: f32,
) -> bool {
    let Ok(node) = tree.node_at(path) else {
        return false;
    };
    let Some(scroll_frame) = frames.at_path(path).and_then(|frame| frame.scroll) else {
        return false;
    };
    let key = scroll_state_key(node, path);
    // Base on the stored offset, not the frame's: relayout is deferred, so
    // several deltas may land between layouts and must accumulate.
    let current = scroll.get(&key);
    let next = (current + delta).clamp(0.0, scroll_frame.max_offset);
    scroll.set(key, next);
    next != current
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
