//! Frame-local grids and the process-lifetime world model.
//! This module exists so the only mutable cross-frame state lives in one owned value.
//! It does not own classification or search rules.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::*;

/// One frame's projection of the bitmap onto the tile grid.
///
/// Rebuilt every cycle and never merged in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    geometry: GridGeometry,
    labels: BTreeMap<TileCoord, TerrainLabel>,
}

impl Grid {
    pub fn new(geometry: GridGeometry) -> Self {
        Self { geometry, labels: BTreeMap::new() }
    }

    pub fn from_labels(
        geometry: GridGeometry,
        labels: impl IntoIterator<Item = (TileCoord, TerrainLabel)>,
    ) -> Self {
        Self { geometry, labels: labels.into_iter().collect() }
    }

    pub fn insert(&mut self, coord: TileCoord, label: TerrainLabel) {
        self.labels.insert(coord, label);
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn label_at(&self, coord: TileCoord) -> Option<TerrainLabel> {
        self.labels.get(&coord).copied()
    }

    /// True when `coord` was classified this frame and may be walked through.
    pub fn is_passable(&self, coord: TileCoord) -> bool {
        self.label_at(coord).is_some_and(TerrainLabel::is_passable)
    }

    pub fn tile(&self, coord: TileCoord) -> Tile {
        self.geometry.tile(coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, TerrainLabel)> + '_ {
        self.labels.iter().map(|(coord, label)| (*coord, *label))
    }

    pub fn count(&self, label: TerrainLabel) -> usize {
        self.labels.values().filter(|l| **l == label).count()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// First tile in row-major order whose rectangle contains `observer`.
    pub fn anchor_for(&self, observer: PixelPos) -> Option<TileCoord> {
        self.labels.keys().copied().find(|coord| self.tile(*coord).contains(observer))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MemoryEntry {
    pub label: TerrainLabel,
    pub last_seen_ms: u64,
}

/// Last-known label of every tile ever classified in this grid session.
///
/// Entries are only added or overwritten; a tile that scrolled out of view keeps its
/// last label indefinitely.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldMemory {
    entries: BTreeMap<TileCoord, MemoryEntry>,
}

impl WorldMemory {
    pub fn record(&mut self, coord: TileCoord, label: TerrainLabel, now_ms: u64) {
        self.entries.insert(coord, MemoryEntry { label, last_seen_ms: now_ms });
    }

    pub fn get(&self, coord: TileCoord) -> Option<MemoryEntry> {
        self.entries.get(&coord).copied()
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, MemoryEntry)> + '_ {
        self.entries.iter().map(|(coord, entry)| (*coord, *entry))
    }

    pub fn fog_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.iter().filter(|(_, entry)| entry.label == TerrainLabel::Fog).map(|(coord, _)| coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tiles already targeted or found unreachable. Grows monotonically within a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitedCache {
    tiles: BTreeSet<TileCoord>,
}

impl VisitedCache {
    /// Returns `false` if the tile was already present.
    pub fn insert(&mut self, coord: TileCoord) -> bool {
        self.tiles.insert(coord)
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains(&coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// All map knowledge older than the current frame, bound to one grid geometry.
///
/// Callers share it behind a single mutex; every read-modify-write sequence of a cycle
/// happens under one lock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldModel {
    geometry: GridGeometry,
    pub memory: WorldMemory,
    pub visited: VisitedCache,
}

impl WorldModel {
    pub fn new(geometry: GridGeometry) -> Self {
        Self { geometry, memory: WorldMemory::default(), visited: VisitedCache::default() }
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Moves the grid anchor. Memory and cache keys refer to the old grid, so a new
    /// session starts empty.
    pub fn recalibrate(&mut self, offset_x: u32, offset_y: u32) {
        *self = Self::new(self.geometry.with_offset(offset_x, offset_y));
    }
}
