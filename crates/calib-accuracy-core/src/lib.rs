//! Raster and projective-geometry primitives for calibration accuracy
//! evaluation.
//!
//! This crate knows nothing about markers, colors or sessions. It provides
//! an RGB image container, bilinear sampling, four-point homographies and a
//! perspective resampler.

mod homography;
mod image;
mod logger;

pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{sample_bilinear_rgb, sample_bilinear_rgb_u8, GrayImage, RgbImage, RgbImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
