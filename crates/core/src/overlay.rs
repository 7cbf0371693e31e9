//! Annotated copies of observed frames for presentation.
//! This module exists so any viewer can show exactly what a cycle saw and chose.
//! It does not own image encoding or display.

use image::{Rgb, RgbImage};

use crate::navigation::Observation;
use crate::types::*;

pub const FRONTIER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const MEMORY_COLOR: Rgb<u8> = Rgb([0, 100, 0]);
pub const TARGET_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const PATH_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
pub const OBSERVER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

const OBSERVER_RADIUS: i32 = 10;

/// Draws candidates, the observer, the chosen target and the path over a copy of `frame`.
/// Anything falling outside the frame is clipped.
pub fn annotate(frame: &RgbImage, observation: &Observation) -> RgbImage {
    let mut canvas = frame.clone();

    for candidate in observation.candidates() {
        let color = match candidate.source {
            CandidateSource::Frontier => FRONTIER_COLOR,
            CandidateSource::Memory => MEMORY_COLOR,
        };
        outline(&mut canvas, candidate.tile, 2, color);
    }
    if let Some(observer) = observation.observer {
        ring(&mut canvas, observer, OBSERVER_RADIUS, 3, OBSERVER_COLOR);
    }
    if let Some(target) = observation.target {
        outline(&mut canvas, target.tile, 3, TARGET_COLOR);
    }
    if let Some(grid) = &observation.grid {
        for step in observation.path.windows(2) {
            let from = grid.tile(step[0]).center();
            let to = grid.tile(step[1]).center();
            line(&mut canvas, from, to, 2, PATH_COLOR);
        }
    }
    canvas
}

fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}

/// Rectangle from the tile's top-left to its bottom-right corner, drawn inward.
fn outline(canvas: &mut RgbImage, tile: Tile, thickness: i32, color: Rgb<u8>) {
    let (x0, y0, w, h) = tile.rect();
    let (x1, y1) = (x0 + w as i32, y0 + h as i32);
    for t in 0..thickness {
        for x in x0..=x1 {
            put(canvas, x, y0 + t, color);
            put(canvas, x, y1 - t, color);
        }
        for y in y0..=y1 {
            put(canvas, x0 + t, y, color);
            put(canvas, x1 - t, y, color);
        }
    }
}

fn line(canvas: &mut RgbImage, from: PixelPos, to: PixelPos, thickness: i32, color: Rgb<u8>) {
    let (dx, dy) = ((to.x - from.x).abs(), -(to.y - from.y).abs());
    let (sx, sy) = (if from.x < to.x { 1 } else { -1 }, if from.y < to.y { 1 } else { -1 });
    let (mut x, mut y, mut err) = (from.x, from.y, dx + dy);
    loop {
        for oy in 0..thickness {
            for ox in 0..thickness {
                put(canvas, x + ox, y + oy, color);
            }
        }
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn ring(canvas: &mut RgbImage, center: PixelPos, radius: i32, thickness: i32, color: Rgb<u8>) {
    let inner = (radius - thickness / 2).max(0);
    let outer = radius + thickness / 2;
    for dy in -outer..=outer {
        for dx in -outer..=outer {
            let d2 = dx * dx + dy * dy;
            if d2 >= inner * inner && d2 <= outer * outer {
                put(canvas, center.x + dx, center.y + dy, color);
            }
        }
    }
}
