use calib_accuracy_core::RgbImageView;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blobs::extract_centers;
use crate::color::filter_color;
use crate::matching::{nearest_match, MatchParams};
use crate::params::{CalibrationParams, PhysicalSpec};
use crate::reference::ReferenceGrid;
use crate::CalibrationError;

/// Aggregate statistics over per-point errors (physical units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub mean: f64,
    pub rms: f64,
    pub max: f64,
}

impl ErrorSummary {
    pub fn from_errors(errors: &[f64]) -> Self {
        if errors.is_empty() {
            return Self::default();
        }
        let n = errors.len() as f64;
        Self {
            count: errors.len(),
            mean: errors.iter().sum::<f64>() / n,
            rms: (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
            max: errors.iter().copied().fold(0.0, f64::max),
        }
    }
}

/// Per-point accuracy of the interior dots in a rectified image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Detected dot centers, rectified pixel space, detection order.
    pub centers: Vec<Point2<f32>>,
    /// Nearest-reference distance for each center, physical units.
    pub errors: Vec<f64>,
    /// Detected dot used as the lattice origin.
    pub middle: Point2<f32>,
    /// Centers converted to physical units relative to `middle`.
    pub physical: Vec<Point2<f64>>,
    /// Reference lattice projected back into rectified pixels.
    pub reference_pixels: Vec<Point2<f32>>,
    pub summary: ErrorSummary,
}

/// Score already-detected centers of a `width x height` rectified image.
pub fn score_centers(
    centers: Vec<Point2<f32>>,
    width: usize,
    height: usize,
    physical: &PhysicalSpec,
    grid: &ReferenceGrid,
    matching: &MatchParams,
) -> Result<ScoreResult, CalibrationError> {
    if centers.is_empty() {
        return Err(CalibrationError::InsufficientData(
            "no interior markers detected in the rectified image".to_string(),
        ));
    }
    if width == 0 || height == 0 {
        return Err(CalibrationError::InvalidArgument(format!(
            "rectified image has zero size: {width}x{height}"
        )));
    }

    let n = centers.len() as f64;
    let sum = centers
        .iter()
        .fold(Vector2::<f64>::zeros(), |acc, c| acc + c.coords.cast::<f64>());
    let mean = Point2::from(sum / n);
    let mean_f32 = mean.cast::<f32>();

    let (middle, _) = nearest_match(mean_f32, &centers, matching).ok_or_else(|| {
        CalibrationError::InsufficientData(format!(
            "no detected marker within {} px of the lattice centroid ({:.1}, {:.1})",
            matching.tolerance_px, mean.x, mean.y
        ))
    })?;

    let ratio = Vector2::new(physical.width / width as f64, physical.height / height as f64);
    let middle_f64 = middle.cast::<f64>();
    let physical_pts: Vec<Point2<f64>> = centers
        .iter()
        .map(|c| Point2::from((c.cast::<f64>() - middle_f64).component_mul(&ratio)))
        .collect();

    let errors = grid.nearest_distances(&physical_pts);
    let reference_pixels = grid
        .points
        .iter()
        .map(|p| (middle_f64 + p.coords.component_div(&ratio)).cast::<f32>())
        .collect();

    let summary = ErrorSummary::from_errors(&errors);
    log::debug!(
        "scored {} markers around ({}, {}): mean {:.4}, max {:.4}",
        summary.count,
        middle.x,
        middle.y,
        summary.mean,
        summary.max
    );

    Ok(ScoreResult {
        centers,
        errors,
        middle,
        physical: physical_pts,
        reference_pixels,
        summary,
    })
}

/// Detect the interior dots of `rectified` and score them against `grid`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = rectified.width, height = rectified.height))
)]
pub fn score(
    rectified: &RgbImageView<'_>,
    physical: &PhysicalSpec,
    grid: &ReferenceGrid,
    params: &CalibrationParams,
) -> Result<ScoreResult, CalibrationError> {
    let mask = filter_color(rectified, params.interior_class, &params.thresholds);
    let centers = extract_centers(&mask, &params.blob);
    score_centers(
        centers,
        rectified.width,
        rectified.height,
        physical,
        grid,
        &params.matching,
    )
}
