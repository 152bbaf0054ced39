//! The view instance: one owner tying reactive state, the build/diff/patch
//! pipeline, layout, animation stepping, render-op emission, and event
//! dispatch together behind a per-tick `update` call.

mod instance;

pub use instance::{UpdateOutcome, ViewInstance};
