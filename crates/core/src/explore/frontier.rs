//! Breadth-first frontier search from the observer's tile.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::{Grid, WorldModel};
use crate::types::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchPolicy {
    /// Offer remembered fog again even after it was targeted or found blocked. Off by
    /// default, so a cached tile is never selected twice.
    pub retry_remembered: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reachability {
    pub anchor: TileCoord,
    /// Frontier candidates in visit order, then remembered fog in row-major order.
    pub candidates: Vec<Candidate>,
    /// Every tile the frontier search touched, the anchor included.
    pub visited: BTreeSet<TileCoord>,
}

impl Reachability {
    pub fn frontier(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.source == CandidateSource::Frontier)
    }
}

/// Fog tiles worth heading for: those connected to the observer through fog or water in
/// this frame, plus every remembered fog tile the search did not touch. Tiles in the
/// visited cache are left out of both unless the policy retries remembered fog.
pub fn reachable_fog(
    observer: PixelPos,
    grid: &Grid,
    world: &WorldModel,
    policy: &SearchPolicy,
) -> Result<Reachability, SkipReason> {
    let Some(anchor) = grid.anchor_for(observer) else {
        return Err(SkipReason::ObserverOffGrid { observer });
    };
    debug!(x = anchor.x, y = anchor.y, label = ?grid.label_at(anchor), "frontier search anchor");

    let geometry = grid.geometry();
    let mut candidates = Vec::new();
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();
    visited.insert(anchor);
    queue.push_back(anchor);

    while let Some(current) = queue.pop_front() {
        let Some(label) = grid.label_at(current) else {
            continue;
        };
        if label == TerrainLabel::Fog && !world.visited.contains(current) {
            candidates.push(Candidate {
                tile: geometry.tile(current),
                source: CandidateSource::Frontier,
            });
        }
        // Only the anchor can be impassable here; it is visited but never expanded.
        if !label.is_passable() {
            continue;
        }
        for neighbor in frontier_neighbors(current, geometry) {
            if grid.is_passable(neighbor) && visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    for coord in world.memory.fog_tiles() {
        if visited.contains(&coord) {
            continue;
        }
        if !policy.retry_remembered && world.visited.contains(coord) {
            continue;
        }
        candidates.push(Candidate { tile: geometry.tile(coord), source: CandidateSource::Memory });
    }

    Ok(Reachability { anchor, candidates, visited })
}

/// All eight surrounding cells, column-major from the top-left.
fn frontier_neighbors(p: TileCoord, geometry: GridGeometry) -> [TileCoord; 8] {
    let (w, h) = (geometry.step_x(), geometry.step_y());
    [
        TileCoord::new(p.x - w, p.y - h),
        TileCoord::new(p.x - w, p.y),
        TileCoord::new(p.x - w, p.y + h),
        TileCoord::new(p.x, p.y - h),
        TileCoord::new(p.x, p.y + h),
        TileCoord::new(p.x + w, p.y - h),
        TileCoord::new(p.x + w, p.y),
        TileCoord::new(p.x + w, p.y + h),
    ]
}
