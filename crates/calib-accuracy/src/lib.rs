//! Geometric accuracy evaluation of a camera setup against a fiducial grid.
//!
//! The target carries four red corner markers around an `11 x 7` lattice of
//! blue dots with known spacing. The pipeline:
//! - threshold the source image in HSV and reduce red regions to centroids,
//! - snap four user corner clicks to those centroids (TL, TR, BR, BL),
//! - warp the corner quadrilateral onto the full image rectangle,
//! - detect the blue dots in the rectified image, convert them to physical
//!   units around the central dot, and report each dot's distance to the
//!   nearest ideal lattice point.
//!
//! ## Quickstart
//!
//! ```no_run
//! use calib_accuracy::{CalibrationParams, CalibrationSession, PhysicalSpec};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = calib_accuracy::imageio::load_rgb("board.png")?;
//! let physical = PhysicalSpec::new(172.2, 114.8, 14.65)?;
//! let mut session = CalibrationSession::new(image, physical, CalibrationParams::default())?;
//! for (x, y) in [(31.0, 40.0), (610.0, 38.0), (612.0, 420.0), (29.0, 418.0)] {
//!     session.submit_corner(Point2::new(x, y))?;
//! }
//! println!("max error: {:.3}", session.results()?.summary.max);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`color`]: HSV conversion and class thresholds.
//! - [`blobs`]: connected regions and centroids.
//! - [`matching`]: soft distance-threshold correspondence.
//! - [`reference`]: ideal lattice and nearest-neighbour distances.
//! - [`rectify`]: four-corner perspective rectification.
//! - [`score`]: per-dot error scoring.
//! - [`session`]: the corner-acquisition / scoring state machine.
//! - [`io`]: JSON config and report.
//! - `imageio` (feature `image`): file decoding and encoding.

pub mod blobs;
pub mod color;
mod error;
pub mod io;
pub mod matching;
mod params;
pub mod rectify;
pub mod reference;
pub mod score;
pub mod session;

#[cfg(feature = "image")]
pub mod imageio;

pub use calib_accuracy_core as core;

pub use blobs::{extract_centers, BlobParams};
pub use color::{filter_color, rgb_to_hsv, ColorClass, ColorMask, ColorThresholds, HsvRange};
pub use error::CalibrationError;
pub use io::{CalibrationIoError, EvaluateConfig, EvaluateReport};
pub use matching::{match_points, MatchParams, DEFAULT_MATCH_TOLERANCE_PX};
pub use params::{CalibrationParams, PhysicalSpec};
pub use rectify::rectify;
pub use reference::{GridLayout, ReferenceGrid};
pub use score::{score, ErrorSummary, ScoreResult};
pub use session::{CalibrationSession, SessionState};

pub use calib_accuracy_core::{init_with_level, level_from_verbosity, RgbImage, RgbImageView};

#[cfg(feature = "tracing")]
pub use calib_accuracy_core::init_tracing;
