use calib_accuracy_core::{
    homography_from_4pt, warp_perspective_rgb, Homography, RgbImage, RgbImageView,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::CalibrationError;

/// Smallest admissible area (px^2) of any triangle formed by three corners.
pub const MIN_CORNER_TRIANGLE_AREA: f64 = 1.0;

fn triangle_area(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    ((b - a).perp(&(c - a)) / 2.0).abs()
}

fn check_corners(corners: &[Point2<f32>]) -> Result<[Point2<f64>; 4], CalibrationError> {
    let quad: [Point2<f32>; 4] = corners.try_into().map_err(|_| {
        CalibrationError::InvalidArgument(format!(
            "rectification needs exactly 4 corners (TL, TR, BR, BL), got {}",
            corners.len()
        ))
    })?;
    if quad.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(CalibrationError::InvalidArgument(
            "corner coordinates must be finite".to_string(),
        ));
    }
    let quad = quad.map(|p| p.cast::<f64>());

    for (i, j, k) in [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)] {
        let area = triangle_area(quad[i], quad[j], quad[k]);
        if area < MIN_CORNER_TRIANGLE_AREA {
            return Err(CalibrationError::DegenerateGeometry(format!(
                "corners {i}, {j}, {k} are collinear or coincident (triangle area {area:.3} px^2)"
            )));
        }
    }
    Ok(quad)
}

/// Homography taking output pixels of a `width x height` rectified image back
/// into the source image, so that the image rectangle maps onto `corners`.
pub fn rectifying_homography(
    corners: &[Point2<f32>],
    width: usize,
    height: usize,
) -> Result<Homography, CalibrationError> {
    if width < 2 || height < 2 {
        return Err(CalibrationError::InvalidArgument(format!(
            "image too small to rectify: {width}x{height}"
        )));
    }
    let quad = check_corners(corners)?;

    let (w, h) = ((width - 1) as f64, (height - 1) as f64);
    let rect = [
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
        Point2::new(w, h),
        Point2::new(0.0, h),
    ];

    let hom = homography_from_4pt(&rect, &quad).ok_or_else(|| {
        CalibrationError::DegenerateGeometry("corner homography is singular".to_string())
    })?;
    let det = hom.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(CalibrationError::DegenerateGeometry(format!(
            "corner homography is near-singular (det = {det:e})"
        )));
    }
    log::debug!("rectifying homography: {:?}", hom.to_array());
    Ok(hom)
}

/// Warp `image` so that the quadrilateral `corners` (TL, TR, BR, BL) fills
/// an output of the same size.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(image, corners),
        fields(width = image.width, height = image.height),
    )
)]
pub fn rectify(
    image: &RgbImageView<'_>,
    corners: &[Point2<f32>],
) -> Result<RgbImage, CalibrationError> {
    let h_src_from_rect = rectifying_homography(corners, image.width, image.height)?;
    Ok(warp_perspective_rgb(
        image,
        &h_src_from_rect,
        image.width,
        image.height,
    ))
}
