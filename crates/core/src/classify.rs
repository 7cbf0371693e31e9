//! Tile classification from sampled bitmap color.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::{Grid, WorldMemory};
use crate::types::*;

/// A reference color with an independent per-channel tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColorRule {
    pub reference: [u8; 3],
    pub tolerance: u8,
}

impl ColorRule {
    pub const fn new(reference: [u8; 3], tolerance: u8) -> Self {
        Self { reference, tolerance }
    }

    pub fn matches(&self, rgb: [u8; 3]) -> bool {
        rgb.iter().zip(self.reference).all(|(channel, reference)| {
            channel.abs_diff(reference) <= self.tolerance
        })
    }
}

pub const FOG_RULE: ColorRule = ColorRule::new([39, 39, 38], 10);
pub const WATER_RULE: ColorRule = ColorRule::new([26, 51, 76], 20);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierRules {
    pub fog: ColorRule,
    pub water: ColorRule,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self { fog: FOG_RULE, water: WATER_RULE }
    }
}

impl ClassifierRules {
    /// Fog is checked first, then water; everything else is land.
    pub fn classify(&self, rgb: [u8; 3]) -> TerrainLabel {
        if self.fog.matches(rgb) {
            TerrainLabel::Fog
        } else if self.water.matches(rgb) {
            TerrainLabel::Water
        } else {
            TerrainLabel::Land
        }
    }
}

/// Labels every tile whose top-left lies on the offset grid, sampling the center pixel.
///
/// Cells are stepped from the offsets and stop one full tile short of the trailing edge,
/// so a partially visible last row or column is never sampled.
pub fn classify_frame(bitmap: &RgbImage, geometry: GridGeometry, rules: &ClassifierRules) -> Grid {
    let mut grid = Grid::new(geometry);
    let GridGeometry { tile_width, tile_height, offset_x, offset_y } = geometry;
    if tile_width == 0 || tile_height == 0 {
        return grid;
    }

    let (width, height) = bitmap.dimensions();
    let mut y = offset_y;
    while y.saturating_add(tile_height) < height {
        let mut x = offset_x;
        while x.saturating_add(tile_width) < width {
            let pixel = bitmap.get_pixel(x + tile_width / 2, y + tile_height / 2);
            grid.insert(TileCoord::new(x as i32, y as i32), rules.classify(pixel.0));
            x += tile_width;
        }
        y += tile_height;
    }

    debug!(
        tiles = grid.len(),
        fog = grid.count(TerrainLabel::Fog),
        water = grid.count(TerrainLabel::Water),
        "classified frame"
    );
    grid
}

/// Classifies a frame and folds every label into `memory` stamped with `now_ms`.
pub fn classify_and_record(
    bitmap: &RgbImage,
    geometry: GridGeometry,
    rules: &ClassifierRules,
    memory: &mut WorldMemory,
    now_ms: u64,
) -> Grid {
    let grid = classify_frame(bitmap, geometry, rules);
    for (coord, label) in grid.iter() {
        memory.record(coord, label, now_ms);
    }
    grid
}
