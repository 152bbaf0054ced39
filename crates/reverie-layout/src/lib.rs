//! Constraint-based layout for the Reverie view runtime: measure bottom-up,
//! arrange top-down, frames parallel to the node tree.

mod constraints;
mod engine;
mod frame;

pub use constraints::Constraints;
pub use engine::{layout_tree, LeafMeasure, NoLeaves};
pub use frame::{scroll_state_key, Frame, ScrollFrame, ScrollOffsets};

/// Container type tags the engine lays out itself. Anything else is overlay
/// ("stack") behavior plus whatever a registered leaf component measures.
pub const KIND_ROW: &str = "row";
pub const KIND_COLUMN: &str = "column";
pub const KIND_SCROLL: &str = "scroll";
pub const KIND_GRID: &str = "grid";
pub const KIND_SPACER: &str = "spacer";
