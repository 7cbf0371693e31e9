//! Annotated frame output for external viewers.

use std::fs;
use std::path::Path;

use image::{ImageError, ImageFormat, RgbImage};

/// Writes a PNG next to `path` and renames it into place, so a viewer polling the file
/// never reads a half-written image.
pub fn write_atomic(image: &RgbImage, path: &Path) -> Result<(), ImageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("png.tmp");
    image.save_with_format(&tmp_path, ImageFormat::Png)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
