//! Soft point correspondence by distance threshold.
//!
//! This is not a bijection: a query can match several candidates and a
//! candidate can be reported for several queries. It works for sparse,
//! well-separated fiducials.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MATCH_TOLERANCE_PX: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Strict pixel radius: a pair matches when `d^2 < tolerance_px^2`.
    pub tolerance_px: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            tolerance_px: DEFAULT_MATCH_TOLERANCE_PX,
        }
    }
}

#[inline]
fn dist2(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a - b).norm_squared()
}

/// Every candidate within tolerance of each query, in query-then-candidate order.
pub fn match_points(
    queries: &[Point2<f32>],
    candidates: &[Point2<f32>],
    params: &MatchParams,
) -> Vec<Point2<f32>> {
    let tol2 = params.tolerance_px * params.tolerance_px;
    let mut out = Vec::new();
    for &q in queries {
        for &c in candidates {
            if dist2(q, c) < tol2 {
                out.push(c);
            }
        }
    }
    out
}

/// The closest of the candidates matching `query`, with the number of matches.
///
/// Returns `None` when nothing lies within tolerance.
pub fn nearest_match(
    query: Point2<f32>,
    candidates: &[Point2<f32>],
    params: &MatchParams,
) -> Option<(Point2<f32>, usize)> {
    let matches = match_points(&[query], candidates, params);
    let count = matches.len();
    let best = matches
        .into_iter()
        .min_by(|a, b| dist2(query, *a).total_cmp(&dist2(query, *b)))?;
    if count > 1 {
        log::warn!(
            "{count} centers within {} px of ({:.1}, {:.1}), using the closest",
            params.tolerance_px,
            query.x,
            query.y
        );
    }
    Some((best, count))
}
