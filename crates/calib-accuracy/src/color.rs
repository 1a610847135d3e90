//! HSV color thresholding for fiducial classes.
//!
//! HSV values use the 8-bit convention of common vision libraries:
//! hue in `[0, 180]` (degrees halved), saturation and value in `[0, 255]`.

use std::fmt;
use std::str::FromStr;

use calib_accuracy_core::{GrayImage, RgbImageView};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::CalibrationError;

/// Marker color classes present on the target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    /// Outer corner markers.
    Red,
    /// Interior lattice dots.
    Blue,
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorClass::Red => f.write_str("red"),
            ColorClass::Blue => f.write_str("blue"),
        }
    }
}

impl FromStr for ColorClass {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(ColorClass::Red),
            "blue" => Ok(ColorClass::Blue),
            other => Err(CalibrationError::InvalidArgument(format!(
                "unknown color class '{other}' (expected 'red' or 'blue')"
            ))),
        }
    }
}

/// Inclusive box in HSV space.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl HsvRange {
    pub const fn new(low: [u8; 3], high: [u8; 3]) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.low[c] <= hsv[c] && hsv[c] <= self.high[c])
    }
}

/// Per-class threshold sets. A pixel belongs to a class when any of the
/// class ranges contains it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorThresholds {
    pub red: Vec<HsvRange>,
    pub blue: Vec<HsvRange>,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            // red wraps around hue 0
            red: vec![
                HsvRange::new([0, 70, 50], [10, 255, 255]),
                HsvRange::new([170, 70, 50], [180, 255, 255]),
            ],
            blue: vec![HsvRange::new([64, 0, 30], [128, 255, 128])],
        }
    }
}

impl ColorThresholds {
    pub fn ranges(&self, class: ColorClass) -> &[HsvRange] {
        match class {
            ColorClass::Red => &self.red,
            ColorClass::Blue => &self.blue,
        }
    }

    /// Reject empty classes and inverted ranges.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for class in [ColorClass::Red, ColorClass::Blue] {
            let ranges = self.ranges(class);
            if ranges.is_empty() {
                return Err(CalibrationError::InvalidArgument(format!(
                    "no HSV ranges configured for class {class}"
                )));
            }
            if let Some(r) = ranges.iter().find(|r| (0..3).any(|c| r.low[c] > r.high[c])) {
                return Err(CalibrationError::InvalidArgument(format!(
                    "inverted HSV range for class {class}: low={:?} high={:?}",
                    r.low, r.high
                )));
            }
        }
        Ok(())
    }
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().clamp(0.0, 180.0) as u8,
        s.round().clamp(0.0, 255.0) as u8,
        v as u8,
    ]
}

/// Binary mask with the dimensions of its source image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl ColorMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        self.data[y * self.width + x] = on;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }

    /// 0/255 rendering for export.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&on| if on { 255 } else { 0 }).collect(),
        }
    }
}

/// Threshold `image` against the ranges of `class`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(image, thresholds),
        fields(width = image.width, height = image.height),
    )
)]
pub fn filter_color(
    image: &RgbImageView<'_>,
    class: ColorClass,
    thresholds: &ColorThresholds,
) -> ColorMask {
    let ranges = thresholds.ranges(class);
    let mut mask = ColorMask::new(image.width, image.height);
    for (on, px) in mask.data.iter_mut().zip(image.data.chunks_exact(3)) {
        let hsv = rgb_to_hsv([px[0], px[1], px[2]]);
        *on = ranges.iter().any(|r| r.contains(hsv));
    }
    log::trace!("{class} mask: {} pixels set", mask.count());
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_accuracy_core::RgbImage;

    #[test]
    fn hsv_anchor_colors() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        // magenta-ish red wraps to the top of the hue range
        assert_eq!(rgb_to_hsv([255, 0, 40])[0], 175);
    }

    #[test]
    fn parses_known_classes_only() {
        assert_eq!("red".parse::<ColorClass>().unwrap(), ColorClass::Red);
        assert_eq!(" Blue ".parse::<ColorClass>().unwrap(), ColorClass::Blue);
        assert!(matches!(
            "green".parse::<ColorClass>(),
            Err(CalibrationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn red_and_blue_masks_are_disjoint_on_pure_colors() {
        let mut img = RgbImage::filled(4, 1, [255, 255, 255]);
        img.put_pixel(0, 0, [255, 0, 0]);
        img.put_pixel(1, 0, [255, 0, 40]);
        img.put_pixel(2, 0, [0, 0, 100]);
        let t = ColorThresholds::default();

        let red = filter_color(&img.view(), ColorClass::Red, &t);
        let blue = filter_color(&img.view(), ColorClass::Blue, &t);
        assert_eq!(red.data, vec![true, true, false, false]);
        assert_eq!(blue.data, vec![false, false, true, false]);
    }

    #[test]
    fn bright_blue_exceeds_value_limit() {
        let img = RgbImage::filled(1, 1, [0, 0, 255]);
        let blue = filter_color(&img.view(), ColorClass::Blue, &ColorThresholds::default());
        assert_eq!(blue.count(), 0);
    }

    #[test]
    fn filtering_is_idempotent_on_rendered_mask() {
        let mut img = RgbImage::filled(6, 5, [30, 200, 30]);
        for (x, y) in [(0, 0), (2, 1), (3, 1), (5, 4)] {
            img.put_pixel(x, y, [220, 20, 20]);
        }
        let t = ColorThresholds::default();
        let mask = filter_color(&img.view(), ColorClass::Red, &t);

        let mut rendered = RgbImage::filled(6, 5, [0, 0, 0]);
        for y in 0..5 {
            for x in 0..6 {
                if mask.get(x, y) {
                    rendered.put_pixel(x, y, [255, 0, 0]);
                }
            }
        }
        assert_eq!(filter_color(&rendered.view(), ColorClass::Red, &t), mask);
    }

    fn is_red(hsv: [u8; 3]) -> bool {
        ColorThresholds::default().red.iter().any(|r| r.contains(hsv))
    }

    fn is_blue(hsv: [u8; 3]) -> bool {
        ColorThresholds::default().blue.iter().any(|r| r.contains(hsv))
    }

    #[test]
    fn red_hue_limits_are_inclusive() {
        assert!(is_red([0, 200, 200]));
        assert!(is_red([10, 200, 200]));
        assert!(!is_red([11, 200, 200]));
        assert!(!is_red([169, 200, 200]));
        assert!(is_red([170, 200, 200]));
        assert!(is_red([180, 200, 200]));
    }

    #[test]
    fn red_saturation_and_value_floors() {
        assert!(!is_red([5, 69, 200]));
        assert!(is_red([5, 70, 200]));
        assert!(!is_red([5, 200, 49]));
        assert!(is_red([5, 200, 50]));
        assert!(is_red([175, 255, 255]));
    }

    #[test]
    fn blue_limits_are_inclusive() {
        assert!(!is_blue([100, 128, 29]));
        assert!(is_blue([100, 128, 30]));
        assert!(is_blue([100, 128, 128]));
        assert!(!is_blue([100, 128, 129]));
        assert!(!is_blue([63, 128, 80]));
        assert!(is_blue([64, 0, 80]));
        assert!(is_blue([128, 255, 80]));
        assert!(!is_blue([129, 255, 80]));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut t = ColorThresholds::default();
        assert!(t.validate().is_ok());
        t.blue = vec![HsvRange::new([100, 0, 0], [50, 255, 255])];
        assert!(matches!(t.validate(), Err(CalibrationError::InvalidArgument(_))));
        t.blue.clear();
        assert!(t.validate().is_err());
    }

    #[test]
    fn gray_export_uses_full_scale() {
        let mut m = ColorMask::new(2, 1);
        m.set(1, 0, true);
        assert_eq!(m.to_gray().data, vec![0, 255]);
    }
}
