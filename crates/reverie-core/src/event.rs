//! The event model: what flows from the host into the tree, and the context
//! handed to event handlers while they run.

use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::motion::AnimationSpec;
use crate::node::TargetRef;

/// Identifier of a handler closure registered during a build. Ids are fresh
/// every rebuild; stale ids from the previous build never resolve.
pub type HandlerId = u64;

/// Host-assigned pointer identity (mouse button id, touch id).
pub type PointerId = u64;

bitflags! {
    /// Keyboard modifier set attached to key events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
    }
}

/// An input event routed onto the tree. The event name doubles as the
/// handler name a node registers under.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    PointerDown { pointer: PointerId, x: f32, y: f32 },
    PointerMove { pointer: PointerId, x: f32, y: f32 },
    PointerUp { pointer: PointerId, x: f32, y: f32 },
    /// Synthesized on release over the press target when no scroll-drag
    /// activated in between.
    Click { pointer: PointerId, x: f32, y: f32 },
    Scroll { x: f32, y: f32, delta_x: f32, delta_y: f32 },
    KeyDown { key: String, modifiers: Modifiers },
    TextInput { text: String },
    Focus,
    Blur,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::PointerDown { .. } => "pointer_down",
            Event::PointerMove { .. } => "pointer_move",
            Event::PointerUp { .. } => "pointer_up",
            Event::Click { .. } => "click",
            Event::Scroll { .. } => "scroll",
            Event::KeyDown { .. } => "key_down",
            Event::TextInput { .. } => "text_input",
            Event::Focus => "focus",
            Event::Blur => "blur",
        }
    }

    /// Pointer position, for the event kinds that carry one.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Event::PointerDown { x, y, .. }
            | Event::PointerMove { x, y, .. }
            | Event::PointerUp { x, y, .. }
            | Event::Click { x, y, .. }
            | Event::Scroll { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}

/// A handler closure collected during a build.
pub type Handler = Rc<dyn Fn(&mut DispatchContext, &Event)>;

/// The instance's handler table, replaced wholesale on every rebuild.
pub type HandlerMap = IndexMap<HandlerId, Handler>;

/// Side effects a handler may request; applied after the handler returns.
#[derive(Clone, Debug)]
pub enum DispatchCommand {
    Capture {
        pointer: PointerId,
        target: TargetRef,
    },
    ReleaseCapture {
        pointer: PointerId,
    },
    RequestFocus {
        target: TargetRef,
    },
    ClearFocus,
}

/// Context handed to event handlers. Commands are collected while the
/// handler runs and drained by the dispatcher afterwards; the handler never
/// holds a reference into the tree.
#[derive(Default)]
pub struct DispatchContext {
    current_target: Option<TargetRef>,
    commands: Vec<DispatchCommand>,
    animation_override: Option<AnimationSpec>,
}

impl DispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The node the currently running handler was found on.
    pub fn target(&self) -> Option<&TargetRef> {
        self.current_target.as_ref()
    }

    /// Route subsequent events for `pointer` to the handling node until
    /// released.
    pub fn capture(&mut self, pointer: PointerId) {
        if let Some(target) = self.current_target.clone() {
            self.commands.push(DispatchCommand::Capture { pointer, target });
        }
    }

    pub fn release_capture(&mut self, pointer: PointerId) {
        self.commands.push(DispatchCommand::ReleaseCapture { pointer });
    }

    pub fn request_focus(&mut self) {
        if let Some(target) = self.current_target.clone() {
            self.commands.push(DispatchCommand::RequestFocus { target });
        }
    }

    pub fn clear_focus(&mut self) {
        self.commands.push(DispatchCommand::ClearFocus);
    }

    /// Run `mutate` now and animate the property changes it causes: the next
    /// rebuild seeds its patch-derived animations with `spec` instead of any
    /// node-declared spec.
    pub fn animate(&mut self, spec: AnimationSpec, mutate: impl FnOnce()) {
        mutate();
        self.animation_override = Some(spec);
    }

    /// The override spec the next rebuild's animation seeding should use,
    /// if a handler requested one.
    pub fn take_animation_override(&mut self) -> Option<AnimationSpec> {
        self.animation_override.take()
    }

    pub fn set_current_target(&mut self, target: Option<TargetRef>) {
        self.current_target = target;
    }

    pub fn drain_commands(&mut self) -> Vec<DispatchCommand> {
        std::mem::take(&mut self.commands)
    }
}
