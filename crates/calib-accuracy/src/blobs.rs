//! Connected regions of a color mask reduced to centroids.
//!
//! Only outermost regions count: a region sitting inside the hole of another
//! region is dropped, as is any region whose outer contour (traced through
//! pixel centers) encloses zero area, e.g. single pixels and one-pixel-wide
//! lines of any direction.

use std::collections::VecDeque;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::color::ColorMask;

/// Region filtering and centroid settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobParams {
    /// Regions with fewer pixels are dropped.
    pub min_area: usize,
    /// Keep fractional centroids instead of truncating toward zero.
    pub subpixel: bool,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_area: 1,
            subpixel: false,
        }
    }
}

/// Raw first-order moments and outline of one connected region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlobMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    /// Area enclosed by the outer contour through pixel centers.
    pub contour_area: f64,
    /// False when the region lies inside a hole of another region.
    pub outermost: bool,
}

impl BlobMoments {
    pub fn is_degenerate(&self) -> bool {
        self.contour_area == 0.0
    }
}

/// Clockwise neighbourhood in image coordinates (y down), starting east.
const DIRS_8: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

const DIRS_4: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

#[inline]
fn offset(w: usize, h: usize, x: usize, y: usize, d: (isize, isize)) -> Option<(usize, usize)> {
    let nx = x.checked_add_signed(d.0)?;
    let ny = y.checked_add_signed(d.1)?;
    (nx < w && ny < h).then_some((nx, ny))
}

fn set_neighbor(mask: &ColorMask, p: (usize, usize), dir: usize) -> Option<(usize, usize)> {
    offset(mask.width, mask.height, p.0, p.1, DIRS_8[dir]).filter(|&(x, y)| mask.get(x, y))
}

fn direction(from: (usize, usize), to: (usize, usize)) -> usize {
    let d = (
        to.0 as isize - from.0 as isize,
        to.1 as isize - from.1 as isize,
    );
    DIRS_8.iter().position(|&o| o == d).unwrap_or(WEST)
}

/// Outer border of the region containing `start`, which must be the region's
/// first pixel in row-major order.
fn trace_outer_contour(mask: &ColorMask, start: (usize, usize)) -> Vec<(usize, usize)> {
    let Some(first) = (0..8).find_map(|k| set_neighbor(mask, start, (WEST + k) % 8)) else {
        return vec![start];
    };

    let mut contour = vec![start];
    let (mut prev, mut cur) = (first, start);
    // every border pixel is entered at most once per incoming direction
    for _ in 0..8 * mask.data.len() {
        let back = direction(cur, prev);
        let Some(next) = (1..=8).find_map(|k| set_neighbor(mask, cur, (back + 8 - k) % 8)) else {
            break;
        };
        if next == start && cur == first {
            break;
        }
        contour.push(next);
        prev = cur;
        cur = next;
    }
    contour
}

/// Shoelace area of a closed polygon with integer vertices.
fn polygon_area(points: &[(usize, usize)]) -> f64 {
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64)
        .sum();
    twice.unsigned_abs() as f64 / 2.0
}

/// Background pixels 4-connected to the area outside the image.
fn outer_background(mask: &ColorMask) -> Vec<bool> {
    let (w, h) = (mask.width, mask.height);
    let mut outer = vec![false; w * h];
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let border = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
            if border && !mask.get(x, y) {
                outer[y * w + x] = true;
                queue.push_back((x, y));
            }
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for d in DIRS_4 {
            if let Some((nx, ny)) = offset(w, h, x, y, d) {
                let n = ny * w + nx;
                if !mask.data[n] && !outer[n] {
                    outer[n] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
    }
    outer
}

/// Collect moments of every 8-connected region, in row-major discovery order.
pub fn connected_regions(mask: &ColorMask) -> Vec<BlobMoments> {
    let (w, h) = (mask.width, mask.height);
    let outer = outer_background(mask);
    let touches_outside = |x: usize, y: usize| {
        DIRS_4.iter().any(|&d| match offset(w, h, x, y, d) {
            Some((nx, ny)) => outer[ny * w + nx],
            None => true,
        })
    };

    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();
    let mut out = Vec::new();

    for start in 0..w * h {
        if !mask.data[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
        let mut outermost = false;
        while let Some(idx) = queue.pop_front() {
            let (x, y) = (idx % w, idx / w);
            m00 += 1.0;
            m10 += x as f64;
            m01 += y as f64;
            outermost |= touches_outside(x, y);

            for d in DIRS_8 {
                if let Some((nx, ny)) = offset(w, h, x, y, d) {
                    let n = ny * w + nx;
                    if mask.data[n] && !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }

        let contour = trace_outer_contour(mask, (start % w, start / w));
        out.push(BlobMoments {
            m00,
            m10,
            m01,
            contour_area: polygon_area(&contour),
            outermost,
        });
    }

    out
}

/// Reduce each usable region of `mask` to its centroid `(m10/m00, m01/m00)`.
///
/// Regions smaller than `min_area`, with a zero-area outline, or nested in
/// another region are skipped silently. Output order follows region
/// discovery and is not meaningful.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(mask, params),
        fields(width = mask.width, height = mask.height),
    )
)]
pub fn extract_centers(mask: &ColorMask, params: &BlobParams) -> Vec<Point2<f32>> {
    let regions = connected_regions(mask);
    let total = regions.len();

    let centers: Vec<Point2<f32>> = regions
        .into_iter()
        .filter(|m| m.outermost && m.m00 >= params.min_area as f64 && !m.is_degenerate())
        .map(|m| {
            let cx = m.m10 / m.m00;
            let cy = m.m01 / m.m00;
            if params.subpixel {
                Point2::new(cx as f32, cy as f32)
            } else {
                Point2::new(cx.trunc() as f32, cy.trunc() as f32)
            }
        })
        .collect();

    log::debug!("{} of {} regions kept as centers", centers.len(), total);
    centers
}
