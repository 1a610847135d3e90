use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// Lattice dimensions of the interior dots.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    pub cols: usize,
    pub rows: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { cols: 11, rows: 7 }
    }
}

impl GridLayout {
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expected dot positions in physical units, centered at the origin.
///
/// Points are ordered column-major: `x` varies slowest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGrid {
    pub layout: GridLayout,
    pub spacing: f64,
    pub points: Vec<Point2<f64>>,
}

/// `n` evenly spaced values over `[start, stop]`, endpoints included.
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut v: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            v[n - 1] = stop;
            v
        }
    }
}

impl ReferenceGrid {
    /// Build the `cols x rows` lattice spanning `±(cols-1)/2` and
    /// `±(rows-1)/2` spacings around the origin.
    pub fn generate(spacing: f64, layout: GridLayout) -> Result<Self, CalibrationError> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "marker spacing must be positive and finite, got {spacing}"
            )));
        }
        if layout.is_empty() {
            return Err(CalibrationError::InvalidArgument(format!(
                "grid layout must be non-empty, got {}x{}",
                layout.cols, layout.rows
            )));
        }

        let half_w = spacing * (layout.cols - 1) as f64 / 2.0;
        let half_h = spacing * (layout.rows - 1) as f64 / 2.0;
        let xs = linspace(-half_w, half_w, layout.cols);
        let ys = linspace(-half_h, half_h, layout.rows);

        let points = xs
            .iter()
            .flat_map(|&x| ys.iter().map(move |&y| Point2::new(x, y)))
            .collect();

        Ok(Self {
            layout,
            spacing,
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distance from each query to its nearest lattice point.
    ///
    /// One-directional: several queries may share the same nearest point.
    pub fn nearest_distances(&self, queries: &[Point2<f64>]) -> Vec<f64> {
        let coords: Vec<[f64; 2]> = self.points.iter().map(|p| [p.x, p.y]).collect();
        let tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(&coords);
        queries
            .iter()
            .map(|q| {
                tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y])
                    .distance
                    .sqrt()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn default_layout_has_77_symmetric_points() {
        for spacing in [0.5, 14.65, 100.0] {
            let g = ReferenceGrid::generate(spacing, GridLayout::default()).unwrap();
            assert_eq!(g.len(), 77);
            for p in &g.points {
                let mirrored = |sx: f64, sy: f64| {
                    g.points
                        .iter()
                        .any(|q| (q.x - sx * p.x).abs() < 1e-9 && (q.y - sy * p.y).abs() < 1e-9)
                };
                let (mx, my) = (mirrored(-1.0, 1.0), mirrored(1.0, -1.0));
                assert!(mx && my, "point {p:?} lacks a mirror image");
            }
        }
    }

    #[test]
    fn extent_and_order_follow_layout() {
        let g = ReferenceGrid::generate(14.65, GridLayout::default()).unwrap();
        let first = g.points[0];
        let last = g.points[76];
        assert_abs_diff_eq!(first.x, -5.0 * 14.65, epsilon = 1e-12);
        assert_abs_diff_eq!(first.y, -3.0 * 14.65, epsilon = 1e-12);
        assert_abs_diff_eq!(last.x, 5.0 * 14.65, epsilon = 1e-12);
        assert_abs_diff_eq!(last.y, 3.0 * 14.65, epsilon = 1e-12);
        // y varies fastest
        assert_abs_diff_eq!(g.points[1].x, first.x, epsilon = 1e-12);
        assert_abs_diff_eq!(g.points[1].y - first.y, 14.65, epsilon = 1e-9);
    }

    #[test]
    fn generation_is_deterministic() {
        let a = ReferenceGrid::generate(3.0, GridLayout::default()).unwrap();
        let b = ReferenceGrid::generate(3.0, GridLayout::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_spacing() {
        for s in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ReferenceGrid::generate(s, GridLayout::default()),
                Err(CalibrationError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn nearest_distance_is_one_directional() {
        let g = ReferenceGrid::generate(10.0, GridLayout { cols: 3, rows: 1 }).unwrap();
        let d = g.nearest_distances(&[
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(10.0, 3.0),
            Point2::new(14.0, 0.0),
        ]);
        let expected = [0.0, 1.0, 3.0, 4.0];
        for (a, b) in d.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }
    }
}
