//! Conversions to and from the `image` crate, plus file helpers.

use std::path::Path;

use calib_accuracy_core::{GrayImage, RgbImage};
use image::ImageReader;

use crate::io::CalibrationIoError;

/// Copy an `image::RgbImage` into the core raster type.
pub fn from_image_rgb(img: &::image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

pub fn to_image_rgb(img: &RgbImage) -> Result<::image::RgbImage, CalibrationIoError> {
    let (w, h) = dims(img.width, img.height)?;
    ::image::RgbImage::from_raw(w, h, img.data.clone()).ok_or_else(|| {
        CalibrationIoError::InvalidBuffer(format!(
            "{} bytes do not form a {w}x{h} RGB image",
            img.data.len()
        ))
    })
}

pub fn to_image_gray(img: &GrayImage) -> Result<::image::GrayImage, CalibrationIoError> {
    let (w, h) = dims(img.width, img.height)?;
    ::image::GrayImage::from_raw(w, h, img.data.clone()).ok_or_else(|| {
        CalibrationIoError::InvalidBuffer(format!(
            "{} bytes do not form a {w}x{h} gray image",
            img.data.len()
        ))
    })
}

fn dims(width: usize, height: usize) -> Result<(u32, u32), CalibrationIoError> {
    let w = u32::try_from(width).ok();
    let h = u32::try_from(height).ok();
    w.zip(h).ok_or_else(|| {
        CalibrationIoError::InvalidBuffer(format!("image dimensions {width}x{height} overflow"))
    })
}

/// Decode any supported image file as RGB.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, CalibrationIoError> {
    let img = ImageReader::open(path)?.decode()?.to_rgb8();
    Ok(from_image_rgb(&img))
}

pub fn save_rgb(path: impl AsRef<Path>, img: &RgbImage) -> Result<(), CalibrationIoError> {
    to_image_rgb(img)?.save(path)?;
    Ok(())
}

pub fn save_gray(path: impl AsRef<Path>, img: &GrayImage) -> Result<(), CalibrationIoError> {
    to_image_gray(img)?.save(path)?;
    Ok(())
}
