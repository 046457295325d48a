//! Interchangeable centroiding strategies over a [`SearchRegion`].

use std::fmt;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::consts::{
    CENTER_OF_MASS_CONFIDENCE, COMPONENT_CONFIDENCE_DISTANCE, GAUSSIAN_FIT_CONFIDENCE,
    MAX_COMPONENT_AREA, MIN_COMPONENT_AREA, PEAK_REFINE_CONFIDENCE, PEAK_REFINE_HALF_WINDOW,
};
use crate::frame::Position;
use crate::track::components::find_blobs;
use crate::track::region::{weighted_centroid, SearchRegion};

/// Which method produced a tracked position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    CenterOfMass,
    PeakRefine,
    GaussianFit,
    ConnectedComponents,
    MomentBased,
    PeakWeighted,
    /// Pure momentum prediction, no centroid measured.
    Momentum,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CenterOfMass => write!(f, "Center of Mass"),
            Self::PeakRefine => write!(f, "Peak Refine"),
            Self::GaussianFit => write!(f, "Gaussian Fit"),
            Self::ConnectedComponents => write!(f, "Connected Components"),
            Self::MomentBased => write!(f, "Moment Based"),
            Self::PeakWeighted => write!(f, "Peak Weighted"),
            Self::Momentum => write!(f, "Momentum"),
        }
    }
}

/// A proposed star position with the producing method's confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub position: Position,
    pub confidence: f64,
    pub method: MethodKind,
}

/// A centroiding strategy. Implementations never fail hard: no usable signal
/// means `None`.
pub trait CentroidMethod: Send + Sync {
    fn kind(&self) -> MethodKind;

    fn locate(&self, region: &SearchRegion) -> Option<Candidate>;
}

/// Methods tried in order by the sequential strategy.
pub fn sequential_methods() -> Vec<Box<dyn CentroidMethod>> {
    vec![Box::new(CenterOfMass), Box::new(PeakRefine)]
}

/// Methods scored against each other by the consensus strategy.
pub fn consensus_methods() -> Vec<Box<dyn CentroidMethod>> {
    vec![
        Box::new(CenterOfMass),
        Box::new(PeakRefine),
        Box::new(GaussianFit),
        Box::new(ConnectedComponents),
        Box::new(MomentBased),
        Box::new(PeakWeighted),
    ]
}

/// `max(cutout - threshold, 0)`.
fn excess(region: &SearchRegion) -> Array2<f64> {
    let t = region.threshold;
    region.cutout.mapv(|v| (v - t).max(0.0))
}

fn candidate(region: &SearchRegion, local: (f64, f64), confidence: f64, method: MethodKind) -> Candidate {
    Candidate {
        position: region.to_plane(local.0, local.1),
        confidence: confidence.clamp(0.0, 1.0),
        method,
    }
}

// ---------------------------------------------------------------------------

/// Intensity-weighted centroid of the whole thresholded cutout.
pub struct CenterOfMass;

impl CentroidMethod for CenterOfMass {
    fn kind(&self) -> MethodKind {
        MethodKind::CenterOfMass
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let weights = excess(region);
        let local = weighted_centroid(weights.view())?;
        Some(candidate(region, local, CENTER_OF_MASS_CONFIDENCE, self.kind()))
    }
}

/// Weighted centroid of an 11x11 window around the brightest pixel.
pub struct PeakRefine;

impl CentroidMethod for PeakRefine {
    fn kind(&self) -> MethodKind {
        MethodKind::PeakRefine
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let (h, w) = region.cutout.dim();
        let (peak_row, peak_col) = region.peak_index();
        let r0 = peak_row.saturating_sub(PEAK_REFINE_HALF_WINDOW);
        let r1 = (peak_row + PEAK_REFINE_HALF_WINDOW + 1).min(h);
        let c0 = peak_col.saturating_sub(PEAK_REFINE_HALF_WINDOW);
        let c1 = (peak_col + PEAK_REFINE_HALF_WINDOW + 1).min(w);

        let t = region.threshold;
        let window = region
            .cutout
            .slice(s![r0..r1, c0..c1])
            .mapv(|v| (v - t).max(0.0));
        let (row, col) = weighted_centroid(window.view())?;
        Some(candidate(
            region,
            (row + r0 as f64, col + c0 as f64),
            PEAK_REFINE_CONFIDENCE,
            self.kind(),
        ))
    }
}

/// Separable Gaussian fit on the 3x3 neighborhood of the peak: a parabola
/// through the log of the background-subtracted values along each axis.
pub struct GaussianFit;

impl CentroidMethod for GaussianFit {
    fn kind(&self) -> MethodKind {
        MethodKind::GaussianFit
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let (h, w) = region.cutout.dim();
        let (row, col) = region.peak_index();
        if row == 0 || row + 1 >= h || col == 0 || col + 1 >= w {
            return None;
        }

        let bg = region.background.median;
        let log_at = |r: usize, c: usize| {
            let v = region.cutout[[r, c]] - bg;
            if v > 0.0 {
                Some(v.ln())
            } else {
                None
            }
        };
        let center = log_at(row, col)?;
        let delta_row = parabola_offset(log_at(row - 1, col)?, center, log_at(row + 1, col)?)?;
        let delta_col = parabola_offset(log_at(row, col - 1)?, center, log_at(row, col + 1)?)?;

        Some(candidate(
            region,
            (row as f64 + delta_row, col as f64 + delta_col),
            GAUSSIAN_FIT_CONFIDENCE,
            self.kind(),
        ))
    }
}

/// Vertex offset of the parabola through (-1, prev), (0, curr), (1, next),
/// clamped to half a pixel. `None` unless `curr` is a strict maximum.
fn parabola_offset(prev: f64, curr: f64, next: f64) -> Option<f64> {
    let denom = prev - 2.0 * curr + next;
    if denom >= -1e-12 {
        return None;
    }
    Some(((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5))
}

/// Isolates the blob nearest the search center and takes its intensity
/// centroid. Confidence falls linearly to zero at 20 px from the center.
pub struct ConnectedComponents;

impl CentroidMethod for ConnectedComponents {
    fn kind(&self) -> MethodKind {
        MethodKind::ConnectedComponents
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let t = region.threshold;
        let mask = region.cutout.mapv(|v| v > t);
        let blobs = find_blobs(&mask, region.cutout.view());

        let (blob, distance) = blobs
            .iter()
            .filter(|b| (MIN_COMPONENT_AREA..=MAX_COMPONENT_AREA).contains(&b.area))
            .map(|b| {
                let center = region.to_plane(b.center.0, b.center.1);
                (b, center.distance(&region.center))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let confidence = (1.0 - distance / COMPONENT_CONFIDENCE_DISTANCE).max(0.0);
        Some(candidate(region, blob.centroid, confidence, self.kind()))
    }
}

/// Thresholded first moments. Compact stars score higher:
/// confidence `min(1, 50 / (n + 10))` for `n` pixels above threshold.
pub struct MomentBased;

impl CentroidMethod for MomentBased {
    fn kind(&self) -> MethodKind {
        MethodKind::MomentBased
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let t = region.threshold;
        let star_pixels = region.cutout.iter().filter(|&&v| v > t).count();
        if star_pixels == 0 {
            return None;
        }
        let local = weighted_centroid(excess(region).view())?;
        let confidence = (50.0 / (star_pixels as f64 + 10.0)).min(1.0);
        Some(candidate(region, local, confidence, self.kind()))
    }
}

/// Centroid with weights `(v - t)^1.5`, emphasizing the core.
pub struct PeakWeighted;

impl CentroidMethod for PeakWeighted {
    fn kind(&self) -> MethodKind {
        MethodKind::PeakWeighted
    }

    fn locate(&self, region: &SearchRegion) -> Option<Candidate> {
        let weights = excess(region).mapv(|v| v.powf(1.5));
        let local = weighted_centroid(weights.view())?;
        let confidence = ((region.peak - region.threshold) / (region.peak + 1.0)).min(1.0);
        Some(candidate(region, local, confidence, self.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parabola_offset_symmetric() {
        assert_eq!(parabola_offset(1.0, 2.0, 1.0), Some(0.0));
        assert!(parabola_offset(1.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_parabola_offset_shifts_toward_larger_side() {
        let offset = parabola_offset(1.0, 2.0, 1.5).unwrap();
        assert!(offset > 0.0 && offset <= 0.5);
    }
}
