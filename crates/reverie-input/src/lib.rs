//! Event routing for the Reverie view runtime: hit-testing against the
//! frame tree and the per-pointer dispatch state machine with capture,
//! focus, and scroll-drag disambiguation.

mod dispatch;
mod hit;

pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use hit::hit_test;
