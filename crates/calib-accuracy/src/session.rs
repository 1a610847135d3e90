//! Two-phase calibration session: corner acquisition, then rectification
//! and scoring.
//!
//! The session is driven by [`CalibrationSession::submit_corner`]. Each click
//! is snapped to a detected corner marker. The fourth accepted corner
//! triggers rectification and scoring synchronously. A session is single-use.

use calib_accuracy_core::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::blobs::extract_centers;
use crate::color::filter_color;
use crate::matching::nearest_match;
use crate::params::{CalibrationParams, PhysicalSpec};
use crate::rectify::rectify;
use crate::reference::ReferenceGrid;
use crate::score::{score, ScoreResult};
use crate::CalibrationError;

/// Number of corner markers bounding the region of interest.
pub const CORNER_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for corner clicks (TL, TR, BR, BL).
    AcquiringCorners,
    /// Rectified image exists; scoring did not complete.
    Rectified,
    /// Results available. Terminal.
    Scored,
    /// Rectification failed. Terminal.
    Failed,
}

pub struct CalibrationSession {
    image: RgbImage,
    physical: PhysicalSpec,
    params: CalibrationParams,
    grid: ReferenceGrid,
    marker_centers: Vec<Point2<f32>>,
    corners: Vec<Point2<f32>>,
    rectified: Option<RgbImage>,
    result: Option<ScoreResult>,
    state: SessionState,
}

impl CalibrationSession {
    /// Start a session on `image`.
    ///
    /// Corner markers are detected once, up front; clicks are matched
    /// against them.
    pub fn new(
        image: RgbImage,
        physical: PhysicalSpec,
        params: CalibrationParams,
    ) -> Result<Self, CalibrationError> {
        physical.validate()?;
        params.validate()?;
        if image.width == 0 || image.height == 0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "empty source image {}x{}",
                image.width, image.height
            )));
        }

        let grid = ReferenceGrid::generate(physical.spacing, params.grid)?;
        let mask = filter_color(&image.view(), params.corner_class, &params.thresholds);
        let marker_centers = extract_centers(&mask, &params.blob);
        log::info!(
            "session started on {}x{} image: {} {} corner markers found",
            image.width,
            image.height,
            marker_centers.len(),
            params.corner_class
        );

        Ok(Self {
            image,
            physical,
            params,
            grid,
            marker_centers,
            corners: Vec::with_capacity(CORNER_COUNT),
            rectified: None,
            result: None,
            state: SessionState::AcquiringCorners,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn physical(&self) -> &PhysicalSpec {
        &self.physical
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    pub fn reference_grid(&self) -> &ReferenceGrid {
        &self.grid
    }

    pub fn source_image(&self) -> &RgbImage {
        &self.image
    }

    /// Corner marker centers detected in the source image.
    pub fn marker_centers(&self) -> &[Point2<f32>] {
        &self.marker_centers
    }

    /// Accepted (snapped) corners so far, in submission order.
    pub fn corners(&self) -> &[Point2<f32>] {
        &self.corners
    }

    /// Feed one corner click.
    ///
    /// A click that matches no marker, or one that snaps to an already
    /// accepted corner, is rejected and leaves the session unchanged. The
    /// fourth accepted corner runs rectification and scoring; their errors
    /// are returned and the session does not recover from them.
    pub fn submit_corner(&mut self, click: Point2<f32>) -> Result<SessionState, CalibrationError> {
        if self.state != SessionState::AcquiringCorners {
            return Err(CalibrationError::InvalidState { state: self.state });
        }

        let matching = &self.params.matching;
        let (snapped, _) = nearest_match(click, &self.marker_centers, matching).ok_or(
            CalibrationError::NoMatchAvailable {
                x: click.x,
                y: click.y,
                tolerance_px: matching.tolerance_px,
            },
        )?;
        if self.corners.contains(&snapped) {
            return Err(CalibrationError::InvalidArgument(format!(
                "corner ({}, {}) already selected",
                snapped.x, snapped.y
            )));
        }

        self.corners.push(snapped);
        log::info!(
            "corner {}/{} accepted at ({}, {})",
            self.corners.len(),
            CORNER_COUNT,
            snapped.x,
            snapped.y
        );

        if self.corners.len() == CORNER_COUNT {
            self.complete()?;
        }
        Ok(self.state)
    }

    fn complete(&mut self) -> Result<(), CalibrationError> {
        let rectified = match rectify(&self.image.view(), &self.corners) {
            Ok(img) => img,
            Err(err) => {
                log::warn!("rectification failed: {err}");
                self.state = SessionState::Failed;
                return Err(err);
            }
        };
        self.state = SessionState::Rectified;
        log::info!("image rectified");

        let result = score(&rectified.view(), &self.physical, &self.grid, &self.params);
        self.rectified = Some(rectified);
        let result = result.inspect_err(|err| log::warn!("scoring failed: {err}"))?;

        log::info!(
            "scored {} markers: mean error {:.4}, max {:.4}",
            result.summary.count,
            result.summary.mean,
            result.summary.max
        );
        self.result = Some(result);
        self.state = SessionState::Scored;
        Ok(())
    }

    /// The rectified image, once corner acquisition has completed.
    pub fn rectified_image(&self) -> Result<&RgbImage, CalibrationError> {
        self.rectified.as_ref().ok_or(CalibrationError::NotAvailable {
            what: "rectified image",
        })
    }

    /// Detected centers and their errors, once scored.
    pub fn results(&self) -> Result<&ScoreResult, CalibrationError> {
        self.result
            .as_ref()
            .ok_or(CalibrationError::NotAvailable { what: "results" })
    }
}
