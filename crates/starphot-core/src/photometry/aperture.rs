//! Aperture geometry and pixel collection.
//!
//! Pixel `(row, col)` has its center at `(x = col, y = row)`, the same
//! convention as tracked positions.

use std::f64::consts::PI;
use std::fmt;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_INNER_ANNULUS, DEFAULT_INNER_RADIUS, DEFAULT_OUTER_ANNULUS};
use crate::error::{Result, StarphotError};
use crate::frame::Position;

/// Signal aperture and sky annulus radii in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApertureParams {
    pub inner_radius: f64,
    pub inner_annulus: f64,
    pub outer_annulus: f64,
}

impl Default for ApertureParams {
    fn default() -> Self {
        Self {
            inner_radius: DEFAULT_INNER_RADIUS,
            inner_annulus: DEFAULT_INNER_ANNULUS,
            outer_annulus: DEFAULT_OUTER_ANNULUS,
        }
    }
}

impl ApertureParams {
    pub fn new(inner_radius: f64, inner_annulus: f64, outer_annulus: f64) -> Self {
        Self {
            inner_radius,
            inner_annulus,
            outer_annulus,
        }
    }

    /// Reject geometry that cannot be measured. A collapsed or inverted
    /// annulus is valid and only disables sky subtraction.
    pub fn validate(&self) -> Result<()> {
        if !self.inner_radius.is_finite() || self.inner_radius <= 0.0 {
            return Err(StarphotError::InvalidAperture(format!(
                "inner radius must be positive, got {}",
                self.inner_radius
            )));
        }
        if !self.inner_annulus.is_finite() || !self.outer_annulus.is_finite() {
            return Err(StarphotError::InvalidAperture(format!(
                "annulus radii must be finite, got {} and {}",
                self.inner_annulus, self.outer_annulus
            )));
        }
        Ok(())
    }

    /// Sky subtraction runs only for a non-empty annulus that starts
    /// outside the signal aperture.
    pub fn sky_enabled(&self) -> bool {
        self.inner_radius < self.inner_annulus && self.inner_annulus < self.outer_annulus
    }

    /// Analytic signal aperture area, `pi * r^2`.
    pub fn aperture_area(&self) -> f64 {
        PI * self.inner_radius * self.inner_radius
    }
}

impl fmt::Display for ApertureParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "r={:.1}, annulus {:.1}..{:.1}",
            self.inner_radius, self.inner_annulus, self.outer_annulus
        )
    }
}

/// How pixels on the aperture boundary contribute to the signal sum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApertureSampling {
    /// A pixel counts fully when its center lies inside the disk.
    #[default]
    Center,
    /// Each pixel is split into n x n sub-samples and weighted by the
    /// fraction that falls inside.
    Subpixel(u32),
}

impl fmt::Display for ApertureSampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Center => write!(f, "Center"),
            Self::Subpixel(n) => write!(f, "Subpixel ({n}x{n})"),
        }
    }
}

/// Pixel bounds `(row0, row1, col0, col1)`, ends exclusive, of the square
/// enclosing a circle, clipped to the image.
fn bounds(dim: (usize, usize), center: &Position, radius: f64) -> Option<(usize, usize, usize, usize)> {
    let (height, width) = dim;
    if !center.x.is_finite() || !center.y.is_finite() {
        return None;
    }
    let reach = radius.ceil() as isize + 1;
    let cx = center.x.round() as isize;
    let cy = center.y.round() as isize;

    let col0 = (cx - reach).max(0);
    let col1 = (cx + reach + 1).min(width as isize);
    let row0 = (cy - reach).max(0);
    let row1 = (cy + reach + 1).min(height as isize);
    if col0 >= col1 || row0 >= row1 {
        return None;
    }
    Some((row0 as usize, row1 as usize, col0 as usize, col1 as usize))
}

/// Sum of the pixels inside a disk of `radius` around `center`.
pub fn aperture_sum(
    image: ArrayView2<'_, f32>,
    center: &Position,
    radius: f64,
    sampling: ApertureSampling,
) -> f64 {
    let Some((row0, row1, col0, col1)) = bounds(image.dim(), center, radius) else {
        return 0.0;
    };
    let r2 = radius * radius;
    let mut sum = 0.0;

    for row in row0..row1 {
        for col in col0..col1 {
            let dx = col as f64 - center.x;
            let dy = row as f64 - center.y;
            let weight = match sampling {
                ApertureSampling::Center => {
                    if dx * dx + dy * dy <= r2 {
                        1.0
                    } else {
                        0.0
                    }
                }
                ApertureSampling::Subpixel(n) => subpixel_fraction(dx, dy, r2, n.max(1)),
            };
            if weight > 0.0 {
                sum += image[[row, col]] as f64 * weight;
            }
        }
    }
    sum
}

/// Fraction of the unit pixel centered at offset (dx, dy) inside the disk.
fn subpixel_fraction(dx: f64, dy: f64, r2: f64, n: u32) -> f64 {
    let step = 1.0 / n as f64;
    let mut inside = 0u32;
    for i in 0..n {
        let sy = dy - 0.5 + (i as f64 + 0.5) * step;
        for j in 0..n {
            let sx = dx - 0.5 + (j as f64 + 0.5) * step;
            if sx * sx + sy * sy <= r2 {
                inside += 1;
            }
        }
    }
    inside as f64 / (n * n) as f64
}

/// Values of the pixels whose centers lie in `inner..=outer` from `center`.
pub fn collect_annulus_pixels(
    image: ArrayView2<'_, f32>,
    center: &Position,
    inner: f64,
    outer: f64,
) -> Vec<f64> {
    let Some((row0, row1, col0, col1)) = bounds(image.dim(), center, outer) else {
        return Vec::new();
    };
    let mut pixels = Vec::new();
    for row in row0..row1 {
        for col in col0..col1 {
            let dx = col as f64 - center.x;
            let dy = row as f64 - center.y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance >= inner && distance <= outer {
                pixels.push(image[[row, col]] as f64);
            }
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_center_sampling_counts_disk_pixels() {
        let image = Array2::<f32>::ones((30, 30));
        let sum = aperture_sum(image.view(), &Position::new(15.0, 15.0), 3.0, ApertureSampling::Center);
        // 29 lattice points lie within radius 3 of an integer center.
        assert_eq!(sum, 29.0);
    }

    #[test]
    fn test_subpixel_sampling_approaches_area() {
        let image = Array2::<f32>::ones((40, 40));
        let sum = aperture_sum(
            image.view(),
            &Position::new(20.3, 19.6),
            6.0,
            ApertureSampling::Subpixel(10),
        );
        assert!((sum - PI * 36.0).abs() < 1.5, "sum = {sum}");
    }

    #[test]
    fn test_annulus_excludes_aperture() {
        let mut image = Array2::<f32>::zeros((40, 40));
        image[[20, 20]] = 1000.0;
        let pixels = collect_annulus_pixels(image.view(), &Position::new(20.0, 20.0), 4.0, 8.0);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_validate() {
        assert!(ApertureParams::default().validate().is_ok());
        assert!(ApertureParams::new(0.0, 12.0, 17.0).validate().is_err());
        assert!(ApertureParams::new(-1.0, 12.0, 17.0).validate().is_err());
        // Inverted annulus only disables sky subtraction.
        let params = ApertureParams::new(9.0, 17.0, 12.0);
        assert!(params.validate().is_ok());
        assert!(!params.sky_enabled());
        // So does an annulus that starts inside the aperture.
        let params = ApertureParams::new(12.0, 10.0, 17.0);
        assert!(params.validate().is_ok());
        assert!(!params.sky_enabled());
    }
}
