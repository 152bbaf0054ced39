//! Core runtime data model for the Reverie view framework: observable state
//! with dependency tracking, the node tree, structural diffing, and the
//! contexts handed to builder functions and event handlers.

mod context;
mod diff;
mod event;
mod geometry;
mod motion;
mod node;
mod normalize;
mod state;
mod style;
mod value;

pub use context::{BuildContext, EnvTable, LocalStateTable};
pub use diff::{apply, diff, PatchOp};
pub use event::{
    DispatchCommand, DispatchContext, Event, Handler, HandlerId, HandlerMap, Modifiers, PointerId,
};
pub use geometry::{Rect, Size};
pub use motion::{AnimationSpec, Curve};
pub use node::{DeferredContent, Node, NodeId, PathError, TargetRef};
pub use normalize::{flatten_groups, normalize_tree};
pub use state::{DependencySet, State, Subscription};
pub use style::{apply_styles, Selector, StyleRule};
pub use value::Value;

/// Type tag of transparent grouping nodes spliced away before layout.
pub const KIND_GROUP: &str = "group";
/// Type tag of the implicit container wrapped around a multi-child root.
pub const KIND_STACK: &str = "stack";
