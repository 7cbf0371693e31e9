//! Shortest tile paths over the current frame.
//! This module exists so navigation can re-plan one step at a time from fresh data.
//! It does not consult world memory: only tiles classified this frame are walkable.

use std::collections::{BTreeMap, VecDeque, btree_map::Entry};

use crate::state::Grid;
use crate::types::*;

/// Breadth-first shortest path from `start` to `goal`, both inclusive.
///
/// Every step (diagonals included) costs one. A step may only land on a fog or water tile
/// present in `grid`; `start` itself is never checked. Returns `[start]` when
/// `start == goal` and an empty path when `goal` cannot be reached.
pub fn find_path(grid: &Grid, start: TileCoord, goal: TileCoord) -> Vec<TileCoord> {
    if start == goal {
        return vec![start];
    }

    let geometry = grid.geometry();
    let mut came_from = BTreeMap::new();
    let mut queue = VecDeque::new();
    came_from.insert(start, start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            return reconstruct_path(&came_from, start, goal);
        }
        for neighbor in path_neighbors(current, geometry) {
            if !grid.is_passable(neighbor) {
                continue;
            }
            if let Entry::Vacant(entry) = came_from.entry(neighbor) {
                entry.insert(current);
                queue.push_back(neighbor);
            }
        }
    }
    Vec::new()
}

fn reconstruct_path(
    came_from: &BTreeMap<TileCoord, TileCoord>,
    start: TileCoord,
    goal: TileCoord,
) -> Vec<TileCoord> {
    let mut p = goal;
    let mut result = vec![p];
    while p != start {
        p = *came_from.get(&p).expect("path must be reconstructible");
        result.push(p);
    }
    result.reverse();
    result
}

/// Axis-aligned steps first (west, east, north, south), then diagonals.
pub(crate) fn path_neighbors(p: TileCoord, geometry: GridGeometry) -> [TileCoord; 8] {
    let (w, h) = (geometry.step_x(), geometry.step_y());
    [
        TileCoord::new(p.x - w, p.y),
        TileCoord::new(p.x + w, p.y),
        TileCoord::new(p.x, p.y - h),
        TileCoord::new(p.x, p.y + h),
        TileCoord::new(p.x - w, p.y - h),
        TileCoord::new(p.x + w, p.y - h),
        TileCoord::new(p.x - w, p.y + h),
        TileCoord::new(p.x + w, p.y + h),
    ]
}
