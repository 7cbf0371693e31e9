//! Bitmap capture from an image file, optionally refreshed by an external command.

use std::path::PathBuf;
use std::process::Command;

use fogchart_core::{CaptureError, FrameSource};
use image::RgbImage;
use image::imageops;
use tracing::debug;

use crate::config::{CaptureConfig, CaptureRegion};

pub struct FileFrameSource {
    path: PathBuf,
    command: Option<Vec<String>>,
    region: Option<CaptureRegion>,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), command: None, region: None }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            path: config.path.clone(),
            command: config.command.clone(),
            region: config.region,
        }
    }

    pub fn with_region(mut self, region: CaptureRegion) -> Self {
        self.region = Some(region);
        self
    }

    fn run_command(&self) -> Result<(), CaptureError> {
        let Some((program, args)) = self.command.as_deref().and_then(<[String]>::split_first)
        else {
            return Ok(());
        };
        let status = Command::new(program).args(args).status()?;
        if !status.success() {
            return Err(CaptureError::Command {
                command: self.command.as_deref().unwrap_or_default().join(" "),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl FrameSource for FileFrameSource {
    fn capture(&mut self) -> Result<RgbImage, CaptureError> {
        self.run_command()?;
        let frame = image::open(&self.path)?.to_rgb8();
        let frame = match self.region {
            // `crop_imm` clamps the rectangle to the frame.
            Some(CaptureRegion { x, y, width, height }) => {
                imageops::crop_imm(&frame, x, y, width, height).to_image()
            }
            None => frame,
        };
        debug!(width = frame.width(), height = frame.height(), "captured frame");
        Ok(frame)
    }
}
