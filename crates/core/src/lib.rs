pub mod classify;
pub mod explore;
pub mod hash;
pub mod navigation;
pub mod overlay;
pub mod pathfinding;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use classify::{ClassifierRules, ColorRule, classify_and_record, classify_frame};
pub use explore::{Reachability, SearchPolicy, nearest_candidate, reachable_fog};
pub use hash::format_snapshot_hash;
pub use navigation::{
    Actuator, CycleReport, FrameSource, Jitter, JitterRange, NavAction, NavState,
    NavigationMachine, Navigator, Observation, ObserverLocator,
};
pub use overlay::annotate;
pub use pathfinding::find_path;
pub use state::{Grid, MemoryEntry, VisitedCache, WorldMemory, WorldModel};
pub use types::*;
