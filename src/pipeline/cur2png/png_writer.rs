use image::{ImageError, ImageFormat, RgbaImage};
use std::io;
use std::path::Path;

use crate::pipeline::error::{ConvResult, ConversionError};
use crate::pipeline::fs_ops::ensure_dir;

/// Writes `image` as PNG, creating parent directories and replacing any existing file.
pub fn write_png(image: &RgbaImage, path: &Path) -> ConvResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).map_err(|e| ConversionError::io(parent, e))?;
    }

    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| match e {
            ImageError::IoError(source) => ConversionError::io(path, source),
            other => ConversionError::io(path, io::Error::other(other)),
        })
}
