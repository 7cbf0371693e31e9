//! Shared fixtures for the core unit test suites.

use image::{Rgb, RgbImage};

use crate::classify::{FOG_RULE, WATER_RULE};
use crate::state::Grid;
use crate::types::*;

pub(crate) const LAND_RGB: [u8; 3] = [200, 180, 120];

pub(crate) fn label_rgb(label: TerrainLabel) -> [u8; 3] {
    match label {
        TerrainLabel::Fog => FOG_RULE.reference,
        TerrainLabel::Water => WATER_RULE.reference,
        TerrainLabel::Land => LAND_RGB,
    }
}

/// Paints `cols * rows` tiles (labels in row-major order) onto a bitmap just large enough
/// for every tile to be sampled.
pub(crate) fn paint_tiles(
    geometry: GridGeometry,
    cols: u32,
    rows: u32,
    labels: &[TerrainLabel],
) -> RgbImage {
    let width = geometry.offset_x + cols * geometry.tile_width + 1;
    let height = geometry.offset_y + rows * geometry.tile_height + 1;
    let mut bitmap = RgbImage::from_pixel(width, height, Rgb(LAND_RGB));
    for (index, label) in labels.iter().enumerate() {
        let col = index as u32 % cols;
        let row = index as u32 / cols;
        let x0 = geometry.offset_x + col * geometry.tile_width;
        let y0 = geometry.offset_y + row * geometry.tile_height;
        for y in y0..y0 + geometry.tile_height {
            for x in x0..x0 + geometry.tile_width {
                bitmap.put_pixel(x, y, Rgb(label_rgb(*label)));
            }
        }
    }
    bitmap
}

/// A grid built from an ASCII picture: `~` water, `#` fog, anything else land.
pub(crate) fn grid_from_rows(rows: &[&str]) -> Grid {
    let geometry = GridGeometry::default();
    let mut grid = Grid::new(geometry);
    for (row, line) in rows.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            let label = match ch {
                '~' => TerrainLabel::Water,
                '#' => TerrainLabel::Fog,
                _ => TerrainLabel::Land,
            };
            grid.insert(tile_at(col as i32, row as i32), label);
        }
    }
    grid
}

/// Coordinate of the tile at column/row index on the default grid.
pub(crate) fn tile_at(col: i32, row: i32) -> TileCoord {
    TileCoord::new(col * 50, row * 45)
}

pub(crate) fn center_of(coord: TileCoord) -> PixelPos {
    GridGeometry::default().tile(coord).center()
}
