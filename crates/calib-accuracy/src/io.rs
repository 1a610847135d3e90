//! JSON configuration and report helpers for accuracy evaluation runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use nalgebra::Point2;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::params::{CalibrationParams, PhysicalSpec};
use crate::score::{ErrorSummary, ScoreResult};
use crate::session::SessionState;
use crate::CalibrationError;

#[derive(thiserror::Error, Debug)]
pub enum CalibrationIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
    #[error("invalid image buffer: {0}")]
    InvalidBuffer(String),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CalibrationIoError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json_pretty<T: Serialize>(value: &T, path: &Path) -> Result<(), CalibrationIoError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Input of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub image_path: String,
    pub physical: PhysicalSpec,
    /// Corner clicks in submission order (TL, TR, BR, BL).
    pub corners: Vec<[f32; 2]>,
    #[serde(default)]
    pub params: CalibrationParams,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub rectified_path: Option<String>,
    /// Where to write the interior-class mask of the rectified image.
    #[serde(default)]
    pub mask_path: Option<String>,
}

impl EvaluateConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationIoError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationIoError> {
        write_json_pretty(self, path.as_ref())
    }

    /// Report destination, `calib_accuracy_report.json` unless configured.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(
            self.output_path
                .as_deref()
                .unwrap_or("calib_accuracy_report.json"),
        )
    }

    pub fn rectified_path(&self) -> Option<PathBuf> {
        self.rectified_path.as_ref().map(PathBuf::from)
    }

    pub fn mask_path(&self) -> Option<PathBuf> {
        self.mask_path.as_ref().map(PathBuf::from)
    }

    pub fn corner_points(&self) -> Vec<Point2<f32>> {
        self.corners.iter().map(|&[x, y]| Point2::new(x, y)).collect()
    }
}

/// Output of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateReport {
    pub image_path: String,
    pub config_path: String,
    pub physical: PhysicalSpec,
    pub state: Option<SessionState>,
    /// Corner markers found in the source image.
    #[serde(default)]
    pub marker_centers: Vec<[f32; 2]>,
    /// Accepted corners after snapping.
    #[serde(default)]
    pub corners: Vec<[f32; 2]>,
    #[serde(default)]
    pub centers: Vec<[f32; 2]>,
    #[serde(default)]
    pub errors: Vec<f64>,
    #[serde(default)]
    pub middle: Option<[f32; 2]>,
    #[serde(default)]
    pub reference_pixels: Vec<[f32; 2]>,
    #[serde(default)]
    pub summary: Option<ErrorSummary>,
    #[serde(default)]
    pub rectified_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn to_pairs(pts: &[Point2<f32>]) -> Vec<[f32; 2]> {
    pts.iter().map(|p| [p.x, p.y]).collect()
}

impl EvaluateReport {
    /// Empty report echoing the run inputs.
    pub fn new(cfg: &EvaluateConfig, config_path: &Path) -> Self {
        Self {
            image_path: cfg.image_path.clone(),
            config_path: config_path.to_string_lossy().into_owned(),
            physical: cfg.physical,
            state: None,
            marker_centers: Vec::new(),
            corners: Vec::new(),
            centers: Vec::new(),
            errors: Vec::new(),
            middle: None,
            reference_pixels: Vec::new(),
            summary: None,
            rectified_path: None,
            error: None,
        }
    }

    /// Record session progress.
    pub fn set_progress(
        &mut self,
        state: SessionState,
        marker_centers: &[Point2<f32>],
        corners: &[Point2<f32>],
    ) {
        self.state = Some(state);
        self.marker_centers = to_pairs(marker_centers);
        self.corners = to_pairs(corners);
    }

    /// Populate report fields from a successful scoring.
    pub fn set_result(&mut self, res: &ScoreResult) {
        self.centers = to_pairs(&res.centers);
        self.errors = res.errors.clone();
        self.middle = Some([res.middle.x, res.middle.y]);
        self.reference_pixels = to_pairs(&res.reference_pixels);
        self.summary = Some(res.summary);
        self.error = None;
    }

    pub fn set_error(&mut self, err: &CalibrationError) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationIoError> {
        read_json(path.as_ref())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationIoError> {
        write_json_pretty(self, path.as_ref())
    }
}
