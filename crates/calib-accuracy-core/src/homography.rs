use nalgebra::{Matrix3, Point2, RowSVector, SMatrix, SVector, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{sample_bilinear_rgb_u8, RgbImage, RgbImageView};

/// Plane projective transform acting on homogeneous pixel coordinates.
///
/// Matrices built by [`homography_from_4pt`] carry `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Row-major copy, convenient for logging and serialization.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.h[(r, c)]))
    }

    /// Map a point, dividing out the projective scale.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        self.h.transform_point(&p)
    }

    pub fn determinant(&self) -> f64 {
        self.h.determinant()
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Isotropic conditioning of a point quadruple: centroid to the origin,
/// mean distance from it to `sqrt(2)`.
struct Conditioning {
    center: Vector2<f64>,
    scale: f64,
}

impl Conditioning {
    fn fit(pts: &[Point2<f64>; 4]) -> Self {
        let center = pts.iter().map(|p| p.coords).sum::<Vector2<f64>>() / 4.0;
        let spread = pts.iter().map(|p| (p.coords - center).norm()).sum::<f64>() / 4.0;
        let scale = if spread > 1e-12 {
            std::f64::consts::SQRT_2 / spread
        } else {
            1.0
        };
        Self { center, scale }
    }

    fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::from((p.coords - self.center) * self.scale)
    }

    fn matrix(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(s, 0.0, -s * c.x, 0.0, s, -s * c.y, 0.0, 0.0, 1.0)
    }

    fn inverse_matrix(&self) -> Matrix3<f64> {
        let (s, c) = (self.scale, self.center);
        Matrix3::new(1.0 / s, 0.0, c.x, 0.0, 1.0 / s, c.y, 0.0, 0.0, 1.0)
    }
}

/// Exact homography with `dst[i] ~ H * src[i]` for four correspondences.
///
/// The eight free entries (`h33` fixed to 1) are solved on conditioned
/// coordinates. `None` if the system is singular, e.g. when three of the
/// points are collinear.
pub fn homography_from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Homography> {
    let cs = Conditioning::fit(src);
    let cd = Conditioning::fit(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (&s, &d)) in src.iter().zip(dst).enumerate() {
        let (p, q) = (cs.apply(s), cd.apply(d));
        let row_u = [p.x, p.y, 1.0, 0.0, 0.0, 0.0, -q.x * p.x, -q.x * p.y];
        let row_v = [0.0, 0.0, 0.0, p.x, p.y, 1.0, -q.y * p.x, -q.y * p.y];
        a.set_row(2 * k, &RowSVector::<f64, 8>::from_row_slice(&row_u));
        a.set_row(2 * k + 1, &RowSVector::<f64, 8>::from_row_slice(&row_v));
        b[2 * k] = q.x;
        b[2 * k + 1] = q.y;
    }

    let sol = a.lu().solve(&b)?;
    let conditioned = Matrix3::from_row_iterator(sol.iter().copied().chain(std::iter::once(1.0)));

    let h = cd.inverse_matrix() * conditioned * cs.matrix();
    let h33 = h[(2, 2)];
    if !h33.is_finite() || h33.abs() < 1e-12 {
        return None;
    }
    let h = h / h33;
    h.iter().all(|v| v.is_finite()).then_some(Homography::new(h))
}

/// Inverse-map resampling of `src` into an `out_w x out_h` image.
///
/// Destination pixel `(x, y)` reads `src` bilinearly at
/// `h_src_from_dst * (x, y)`; positions outside `src` come out black.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(src, h_src_from_dst),
        fields(width = src.width, height = src.height),
    )
)]
pub fn warp_perspective_rgb(
    src: &RgbImageView<'_>,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> RgbImage {
    let mut out = RgbImage::filled(out_w, out_h, [0, 0, 0]);
    for (i, px) in out.data.chunks_exact_mut(3).enumerate() {
        let dst = Point2::new((i % out_w) as f64, (i / out_w) as f64);
        let p = h_src_from_dst.apply(dst);
        if p.x.is_finite() && p.y.is_finite() {
            px.copy_from_slice(&sample_bilinear_rgb_u8(src, p.x, p.y));
        }
    }
    out
}
