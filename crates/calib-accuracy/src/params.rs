use serde::{Deserialize, Serialize};

use crate::blobs::BlobParams;
use crate::color::{ColorClass, ColorThresholds};
use crate::matching::MatchParams;
use crate::reference::GridLayout;
use crate::CalibrationError;

/// Ground-truth measurements of the physical target, in any consistent unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSpec {
    /// Distance between the left and right corner markers.
    pub width: f64,
    /// Distance between the top and bottom corner markers.
    pub height: f64,
    /// Distance between neighbouring interior dots.
    pub spacing: f64,
}

impl PhysicalSpec {
    pub fn new(width: f64, height: f64, spacing: f64) -> Result<Self, CalibrationError> {
        let spec = Self {
            width,
            height,
            spacing,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (name, v) in [
            ("width", self.width),
            ("height", self.height),
            ("spacing", self.spacing),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(CalibrationError::InvalidArgument(format!(
                    "physical {name} must be positive and finite, got {v}"
                )));
            }
        }
        Ok(())
    }
}

/// Pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub thresholds: ColorThresholds,
    pub blob: BlobParams,
    pub matching: MatchParams,
    pub grid: GridLayout,
    /// Class of the four outer corner markers.
    pub corner_class: ColorClass,
    /// Class of the interior lattice dots.
    pub interior_class: ColorClass,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            thresholds: ColorThresholds::default(),
            blob: BlobParams::default(),
            matching: MatchParams::default(),
            grid: GridLayout::default(),
            corner_class: ColorClass::Red,
            interior_class: ColorClass::Blue,
        }
    }
}

impl CalibrationParams {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.thresholds.validate()?;
        let tol = self.matching.tolerance_px;
        if !tol.is_finite() || tol <= 0.0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "match tolerance must be positive and finite, got {tol}"
            )));
        }
        if self.corner_class == self.interior_class {
            return Err(CalibrationError::InvalidArgument(format!(
                "corner and interior markers share the color class {}",
                self.corner_class
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_spec_rejects_non_positive() {
        assert!(PhysicalSpec::new(172.2, 114.8, 14.65).is_ok());
        assert!(PhysicalSpec::new(0.0, 114.8, 14.65).is_err());
        assert!(PhysicalSpec::new(172.2, -1.0, 14.65).is_err());
        assert!(PhysicalSpec::new(172.2, 114.8, f64::NAN).is_err());
    }

    #[test]
    fn params_deserialize_from_partial_json() {
        let p: CalibrationParams =
            serde_json::from_str(r#"{ "matching": { "tolerance_px": 7.5 } }"#).unwrap();
        assert_eq!(p.matching.tolerance_px, 7.5);
        assert_eq!(p.grid, GridLayout::default());
        assert_eq!(p.corner_class, ColorClass::Red);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn params_reject_shared_class() {
        let p = CalibrationParams {
            interior_class: ColorClass::Red,
            ..CalibrationParams::default()
        };
        assert!(matches!(p.validate(), Err(CalibrationError::InvalidArgument(_))));
    }
}
