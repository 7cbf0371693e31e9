//! Reachable-fog search and target selection.
//! This module exists to keep exploration policy separate from path search primitives.
//! It does not own cycle scheduling or actuation.

mod frontier;
mod selector;

pub use frontier::{Reachability, SearchPolicy, reachable_fog};
pub use selector::nearest_candidate;
