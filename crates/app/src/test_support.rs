use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fogchart_core::{
    Actuator, CaptureError, FrameSource, GridGeometry, Navigator, ObserverLocator, PixelPos,
    TileCoord, WorldModel,
};
use image::{Rgb, RgbImage};

use crate::pipeline::Pipeline;

pub const WATER: Rgb<u8> = Rgb([26, 51, 76]);
pub const FOG: Rgb<u8> = Rgb([39, 39, 38]);

/// One row of three tiles: water under the observer, then two fog tiles.
pub fn water_then_fog() -> RgbImage {
    RgbImage::from_fn(151, 46, |x, _| if x < 50 { WATER } else { FOG })
}

pub fn center(x: i32, y: i32) -> PixelPos {
    GridGeometry::default().tile(TileCoord::new(x, y)).center()
}

/// Returns the same bitmap forever, or a capture failure when empty.
pub struct FixedFrame(pub Option<RgbImage>);

impl FrameSource for FixedFrame {
    fn capture(&mut self) -> Result<RgbImage, CaptureError> {
        self.0.clone().ok_or_else(|| CaptureError::Io(io::Error::other("no display")))
    }
}

pub struct FixedObserver(pub Option<PixelPos>);

impl ObserverLocator for FixedObserver {
    fn locate(&self, _bitmap: &RgbImage) -> Option<PixelPos> {
        self.0
    }
}

#[derive(Clone, Default)]
pub struct Clicks(pub Arc<Mutex<Vec<PixelPos>>>);

impl Clicks {
    pub fn taken(&self) -> Vec<PixelPos> {
        self.0.lock().expect("clicks lock").clone()
    }
}

impl Actuator for Clicks {
    fn move_and_trigger(&mut self, target: PixelPos, _transition: Option<Duration>) {
        self.0.lock().expect("clicks lock").push(target);
    }
}

/// A pipeline over `water_then_fog` with the observer on the water tile.
pub fn fixture_pipeline() -> (Pipeline, Clicks) {
    let clicks = Clicks::default();
    let pipeline = Pipeline::new(
        Navigator::default(),
        Box::new(FixedFrame(Some(water_then_fog()))),
        Box::new(FixedObserver(Some(center(0, 0)))),
        Box::new(clicks.clone()),
        WorldModel::default(),
    );
    (pipeline, clicks)
}
