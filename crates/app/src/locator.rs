//! Observer location by normalized template matching.
//! This module exists so the core can ask "where is the observer" without knowing how.
//! It does not own capture or any confidence policy beyond the single threshold.

use std::path::Path;

use fogchart_core::{ObserverLocator, PixelPos};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageError, RgbImage};
use tracing::debug;

/// Templates whose shrunk side would fall below this skip the coarse pass.
const MIN_COARSE_SIDE: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Match {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    score: f64,
}

/// Zero-mean normalized cross-correlation against the template at four right-angle
/// rotations. The best score wins and must reach `confidence`.
pub struct TemplateLocator {
    variants: Vec<GrayImage>,
    confidence: f32,
    coarse_factor: u32,
}

impl TemplateLocator {
    pub fn new(template: GrayImage, confidence: f32, coarse_factor: u32) -> Self {
        let variants = vec![
            imageops::rotate90(&template),
            imageops::rotate180(&template),
            imageops::rotate270(&template),
            template,
        ];
        Self { variants, confidence, coarse_factor: coarse_factor.max(1) }
    }

    pub fn load(path: &Path, confidence: f32, coarse_factor: u32) -> Result<Self, ImageError> {
        Ok(Self::new(image::open(path)?.to_luma8(), confidence, coarse_factor))
    }

    fn best_match(&self, frame: &GrayImage, template: &GrayImage) -> Option<Match> {
        let (tw, th) = template.dimensions();
        if tw > frame.width() || th > frame.height() || tw == 0 || th == 0 {
            return None;
        }
        let factor = self.coarse_factor;
        if factor == 1 || tw / factor < MIN_COARSE_SIDE || th / factor < MIN_COARSE_SIDE {
            return search_all(frame, template);
        }

        let coarse = search_all(&shrink(frame, factor), &shrink(template, factor))?;
        let (cx, cy) = (coarse.x * factor, coarse.y * factor);
        let first = (cx.saturating_sub(factor), cy.saturating_sub(factor));
        let last = ((cx + factor).min(frame.width() - tw), (cy + factor).min(frame.height() - th));
        search(frame, template, first, last)
    }
}

impl ObserverLocator for TemplateLocator {
    fn locate(&self, bitmap: &RgbImage) -> Option<PixelPos> {
        let frame = imageops::grayscale(bitmap);
        let best = self
            .variants
            .iter()
            .filter_map(|template| self.best_match(&frame, template))
            .max_by(|a, b| a.score.total_cmp(&b.score))?;
        debug!(score = best.score, x = best.x, y = best.y, "best template match");
        if best.score < f64::from(self.confidence) {
            return None;
        }
        Some(PixelPos::new((best.x + best.width / 2) as i32, (best.y + best.height / 2) as i32))
    }
}

fn search_all(frame: &GrayImage, template: &GrayImage) -> Option<Match> {
    let (tw, th) = template.dimensions();
    if tw > frame.width() || th > frame.height() {
        return None;
    }
    search(frame, template, (0, 0), (frame.width() - tw, frame.height() - th))
}

fn shrink(image: &GrayImage, factor: u32) -> GrayImage {
    let width = (image.width() / factor).max(1);
    let height = (image.height() / factor).max(1);
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Scores every top-left position in the inclusive window `first..=last`.
fn search(
    frame: &GrayImage,
    template: &GrayImage,
    first: (u32, u32),
    last: (u32, u32),
) -> Option<Match> {
    let (tw, th) = template.dimensions();
    let n = f64::from(tw * th);
    let mean = template.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / n;
    let centered: Vec<f64> = template.pixels().map(|p| f64::from(p.0[0]) - mean).collect();
    let template_norm = centered.iter().map(|v| v * v).sum::<f64>().sqrt();
    if template_norm <= f64::EPSILON {
        return None;
    }

    let mut best: Option<Match> = None;
    for y in first.1..=last.1 {
        for x in first.0..=last.0 {
            let score = score_at(frame, &centered, tw, th, x, y) / template_norm;
            if best.is_none_or(|b| score > b.score) {
                best = Some(Match { x, y, width: tw, height: th, score });
            }
        }
    }
    best
}

/// Correlation of the window at `(x, y)` with the centered template, divided by the
/// window's own deviation. Flat windows score zero.
fn score_at(frame: &GrayImage, centered: &[f64], tw: u32, th: u32, x: u32, y: u32) -> f64 {
    let (mut sum, mut sum_sq, mut cross) = (0.0f64, 0.0f64, 0.0f64);
    for ty in 0..th {
        for tx in 0..tw {
            let value = f64::from(frame.get_pixel(x + tx, y + ty).0[0]);
            sum += value;
            sum_sq += value * value;
            cross += value * centered[(ty * tw + tx) as usize];
        }
    }
    let variance = sum_sq - sum * sum / f64::from(tw * th);
    if variance <= 1e-9 {
        return 0.0;
    }
    cross / variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// An asymmetric 12x10 glyph: a bright L-shape with a dark notch.
    fn glyph() -> GrayImage {
        GrayImage::from_fn(12, 10, |x, y| {
            let bright = x < 3 || y > 6 || (x == 8 && y == 2);
            Luma([if bright { 230 } else { 40 }])
        })
    }

    fn embed(template: &GrayImage, at: (u32, u32), size: (u32, u32)) -> RgbImage {
        let mut frame = RgbImage::from_pixel(size.0, size.1, Rgb([90, 90, 90]));
        for (x, y, pixel) in template.enumerate_pixels() {
            let v = pixel.0[0];
            frame.put_pixel(at.0 + x, at.1 + y, Rgb([v, v, v]));
        }
        frame
    }

    #[test]
    fn finds_the_center_of_an_exact_match() {
        let locator = TemplateLocator::new(glyph(), 0.7, 4);
        let frame = embed(&glyph(), (37, 21), (120, 80));
        assert_eq!(locator.locate(&frame), Some(PixelPos::new(37 + 6, 21 + 5)));
    }

    #[test]
    fn finds_a_rotated_observer() {
        let locator = TemplateLocator::new(glyph(), 0.7, 1);
        let turned = imageops::rotate90(&glyph());
        let frame = embed(&turned, (50, 12), (100, 60));
        let (w, h) = (turned.width() as i32, turned.height() as i32);
        assert_eq!(locator.locate(&frame), Some(PixelPos::new(50 + w / 2, 12 + h / 2)));
    }

    #[test]
    fn weak_matches_are_not_found() {
        let locator = TemplateLocator::new(glyph(), 0.7, 1);
        let stripes = RgbImage::from_fn(60, 40, |x, _| {
            if x % 2 == 0 { Rgb([230, 230, 230]) } else { Rgb([40, 40, 40]) }
        });
        assert_eq!(locator.locate(&stripes), None);
        assert_eq!(locator.locate(&RgbImage::from_pixel(60, 40, Rgb([90, 90, 90]))), None);
    }

    #[test]
    fn coarse_pass_then_refinement_finds_large_templates() {
        let blocks = GrayImage::from_fn(32, 32, |x, y| {
            Luma([if (x / 8 + (y / 8) * 3) % 4 == 0 { 220 } else { 30 }])
        });
        let locator = TemplateLocator::new(blocks.clone(), 0.7, 4);
        let frame = embed(&blocks, (40, 24), (160, 120));
        assert_eq!(locator.locate(&frame), Some(PixelPos::new(56, 40)));
    }

    #[test]
    fn template_larger_than_frame_is_not_found() {
        let locator = TemplateLocator::new(glyph(), 0.7, 1);
        assert_eq!(locator.locate(&RgbImage::new(8, 8)), None);
    }
}
