//! Animation spec values carried on nodes and dispatch overrides.
//!
//! The runtime's own stepping is strictly linear; the curve is a named
//! identifier a renderer may consult for remapping progress.

use std::time::Duration;

/// Named easing curve identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Curve {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Curve {
    /// Parse a curve name; unknown names fall back to linear.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ease_in" => Curve::EaseIn,
            "ease_out" => Curve::EaseOut,
            "ease_in_out" => Curve::EaseInOut,
            _ => Curve::Linear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Curve::Linear => "linear",
            Curve::EaseIn => "ease_in",
            Curve::EaseOut => "ease_out",
            Curve::EaseInOut => "ease_in_out",
        }
    }
}

/// Duration, delay, and curve identifier for a scheduled transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationSpec {
    pub duration: Duration,
    pub delay: Duration,
    pub curve: Curve,
}

impl AnimationSpec {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
            curve: Curve::Linear,
        }
    }

    pub fn millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self::millis(200)
    }
}
