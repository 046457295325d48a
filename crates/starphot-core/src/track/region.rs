//! Search cutout and adaptive threshold shared by every centroid method.

use ndarray::{s, Array2, ArrayView2};

use crate::consts::{
    ACCEPTANCE_RADIUS_FACTOR, BRIGHT_STAR_MULTIPLIER, BRIGHT_STAR_RATIO, EPSILON,
    FAINT_STAR_MULTIPLIER, MODERATE_STAR_MULTIPLIER, MODERATE_STAR_RATIO,
};
use crate::frame::Position;
use crate::stats::{sigma_clipped_stats, ClippedStats, SigmaClipParams};

/// Square cutout of a plane around the search center, with its background
/// statistics and detection threshold.
#[derive(Clone, Debug)]
pub struct SearchRegion {
    /// Cutout pixels, shape = (rows, cols).
    pub cutout: Array2<f64>,
    /// Column of the cutout's first pixel in the full plane.
    pub origin_x: usize,
    /// Row of the cutout's first pixel in the full plane.
    pub origin_y: usize,
    pub plane_width: usize,
    pub plane_height: usize,
    /// Where the tracker expected the star (previous position).
    pub expected: Position,
    /// Momentum-predicted search center.
    pub center: Position,
    /// Adaptive search radius in pixels.
    pub radius: f64,
    pub background: ClippedStats,
    pub peak: f64,
    pub threshold: f64,
}

impl SearchRegion {
    /// Cut a `2 * radius` square around `center`, clamped to the plane.
    ///
    /// Returns `None` when the clamped cutout is empty.
    pub fn extract(
        plane: &Array2<f32>,
        expected: Position,
        center: Position,
        radius: f64,
    ) -> Option<Self> {
        let (h, w) = plane.dim();
        if !center.x.is_finite() || !center.y.is_finite() {
            return None;
        }
        let cx = center.x.floor() as isize;
        let cy = center.y.floor() as isize;
        let r = radius.max(0.0) as isize;

        let x_min = (cx - r).max(0);
        let x_max = (cx + r).min(w as isize);
        let y_min = (cy - r).max(0);
        let y_max = (cy + r).min(h as isize);
        if x_min >= x_max || y_min >= y_max {
            return None;
        }

        let (x_min, x_max, y_min, y_max) =
            (x_min as usize, x_max as usize, y_min as usize, y_max as usize);
        let cutout = plane
            .slice(s![y_min..y_max, x_min..x_max])
            .mapv(|v| v as f64);

        let values: Vec<f64> = cutout.iter().copied().collect();
        let background = sigma_clipped_stats(&values, &SigmaClipParams::default())?;
        let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let threshold = adaptive_threshold(&background, peak);

        Some(Self {
            cutout,
            origin_x: x_min,
            origin_y: y_min,
            plane_width: w,
            plane_height: h,
            expected,
            center,
            radius,
            background,
            peak,
            threshold,
        })
    }

    /// Convert cutout-local (row, col) coordinates to a plane position.
    pub fn to_plane(&self, row: f64, col: f64) -> Position {
        Position::new(col + self.origin_x as f64, row + self.origin_y as f64)
    }

    /// Convert a plane position to cutout-local (row, col) coordinates.
    pub fn to_local(&self, position: &Position) -> (f64, f64) {
        (
            position.y - self.origin_y as f64,
            position.x - self.origin_x as f64,
        )
    }

    /// Acceptance test: close enough to the expected position and clear of
    /// the plane edges.
    pub fn accepts(&self, position: &Position, edge_margin: f64) -> bool {
        let distance = position.distance(&self.expected);
        distance <= self.radius * ACCEPTANCE_RADIUS_FACTOR
            && position.x > edge_margin
            && position.x < self.plane_width as f64 - edge_margin
            && position.y > edge_margin
            && position.y < self.plane_height as f64 - edge_margin
    }

    /// (row, col) of the brightest cutout pixel. The first maximum wins.
    pub fn peak_index(&self) -> (usize, usize) {
        let mut best = (0, 0);
        let mut best_val = f64::NEG_INFINITY;
        for ((row, col), &v) in self.cutout.indexed_iter() {
            if v > best_val {
                best_val = v;
                best = (row, col);
            }
        }
        best
    }
}

/// Detection threshold `median + k * std`, where `k` shrinks for brighter
/// stars: 2.0 if (peak - median) / std > 10, 2.5 if > 5, else 3.0.
pub fn adaptive_threshold(background: &ClippedStats, peak: f64) -> f64 {
    let ratio = (peak - background.median) / (background.std + EPSILON);
    let multiplier = if ratio > BRIGHT_STAR_RATIO {
        BRIGHT_STAR_MULTIPLIER
    } else if ratio > MODERATE_STAR_RATIO {
        MODERATE_STAR_MULTIPLIER
    } else {
        FAINT_STAR_MULTIPLIER
    };
    background.median + multiplier * background.std
}

/// Intensity-weighted center of `weights`, as local (row, col).
///
/// Returns `None` when the total weight is not positive.
pub fn weighted_centroid(weights: ArrayView2<'_, f64>) -> Option<(f64, f64)> {
    let mut sum_r = 0.0;
    let mut sum_c = 0.0;
    let mut sum_w = 0.0;
    for ((row, col), &w) in weights.indexed_iter() {
        if w > 0.0 {
            sum_r += row as f64 * w;
            sum_c += col as f64 * w;
            sum_w += w;
        }
    }
    if sum_w > 0.0 {
        Some((sum_r / sum_w, sum_c / sum_w))
    } else {
        None
    }
}
