use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TILE_WIDTH: u32 = 50;
pub const DEFAULT_TILE_HEIGHT: u32 = 45;

/// Top-left pixel of a grid cell.
///
/// Ordered by `(y, x)` so ordered maps walk a frame row by row, the same order the
/// classifier visits cells in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub y: i32,
    pub x: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }
}

/// A pixel position in source-bitmap space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: i32,
    pub y: i32,
}

impl PixelPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: PixelPos) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

/// Cell size and anchor offset shared by every coordinate of one grid session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridGeometry {
    pub tile_width: u32,
    pub tile_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

impl GridGeometry {
    pub fn with_offset(self, offset_x: u32, offset_y: u32) -> Self {
        Self { offset_x, offset_y, ..self }
    }

    pub fn tile(&self, coord: TileCoord) -> Tile {
        Tile { coord, width: self.tile_width, height: self.tile_height }
    }

    pub fn step_x(&self) -> i32 {
        self.tile_width as i32
    }

    pub fn step_y(&self) -> i32 {
        self.tile_height as i32
    }
}

/// A grid cell with its size, used both as identity and as a drawable region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    pub width: u32,
    pub height: u32,
}

impl Tile {
    /// `(x, y, width, height)` in bitmap pixels.
    pub fn rect(&self) -> (i32, i32, u32, u32) {
        (self.coord.x, self.coord.y, self.width, self.height)
    }

    pub fn center(&self) -> PixelPos {
        PixelPos::new(
            self.coord.x + (self.width / 2) as i32,
            self.coord.y + (self.height / 2) as i32,
        )
    }

    /// Whether `pos` lies within half a tile of the center on both axes.
    ///
    /// Both edges are inclusive, so a point on a shared border belongs to both neighbors;
    /// callers resolve that by taking the first tile in row-major order.
    pub fn contains(&self, pos: PixelPos) -> bool {
        let center = self.center();
        pos.x.abs_diff(center.x) <= self.width / 2 && pos.y.abs_diff(center.y) <= self.height / 2
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerrainLabel {
    Fog,
    Water,
    Land,
}

impl TerrainLabel {
    /// Fog is unknown but enterable; land blocks.
    pub fn is_passable(self) -> bool {
        matches!(self, Self::Fog | Self::Water)
    }
}

/// Where a reachable-fog candidate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Connected to the observer through passable tiles in the current frame.
    Frontier,
    /// Remembered as fog from an earlier observation, not reached this frame.
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub tile: Tile,
    pub source: CandidateSource,
}

/// Why a navigation cycle ended without actuating. None of these halt the loop.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("observer not found")]
    ObserverNotFound,
    #[error("observer at ({}, {}) is not aligned to any grid tile", observer.x, observer.y)]
    ObserverOffGrid { observer: PixelPos },
    #[error("no reachable fog tiles")]
    NoReachableTargets,
    #[error("no usable path to ({}, {}) (path length {path_len})", target.x, target.y)]
    NoPathFound { target: TileCoord, path_len: usize },
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// The outcome of planning one navigation cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Skip(SkipReason),
    /// Move one tile along the path toward `target`.
    Step { target: Tile, next: Tile, click: PixelPos },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error while capturing frame")]
    Io(#[from] io::Error),
    #[error("could not decode captured frame")]
    Decode(#[from] image::ImageError),
    #[error("capture command `{command}` failed: {status}")]
    Command { command: String, status: String },
}
