//! The autonomous decision loop: observe, classify, search, select, step.
//! This module exists to turn one bitmap plus world memory into at most one actuation.
//! It does not own timers or threads; the runtime drives `NavigationMachine` with them.

use std::time::Duration;

use image::RgbImage;

use crate::types::{CaptureError, PixelPos};

mod cycle;
mod machine;

pub use cycle::{CycleReport, Navigator, Observation};
pub use machine::{
    DEFAULT_JITTER_MAX_SECS, DEFAULT_JITTER_MIN_SECS, Jitter, JitterRange, NavAction,
    NavState, NavigationMachine,
};

/// Produces the bitmap for one observation.
pub trait FrameSource {
    fn capture(&mut self) -> Result<RgbImage, CaptureError>;
}

/// Finds the observer's pixel position, or `None` when not confidently found.
pub trait ObserverLocator {
    fn locate(&self, bitmap: &RgbImage) -> Option<PixelPos>;
}

/// Moves the pointer and triggers the primary action. Fire-and-forget.
pub trait Actuator {
    fn move_and_trigger(&mut self, target: PixelPos, transition: Option<Duration>);
}

#[cfg(test)]
mod tests;
