use crate::session::SessionState;

/// Errors returned by the calibration pipeline and session.
///
/// All of them are local and deterministic: retrying with the same input
/// yields the same error.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("operation not valid in session state {state:?}")]
    InvalidState { state: SessionState },
    #[error("no marker center within {tolerance_px} px of ({x:.1}, {y:.1})")]
    NoMatchAvailable { x: f32, y: f32, tolerance_px: f32 },
    #[error("{what} not available yet")]
    NotAvailable { what: &'static str },
}
