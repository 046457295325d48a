#![allow(dead_code)]

use ndarray::Array2;

use starphot_core::frame::{PixelPlane, Position};

pub const WIDTH: usize = 80;
pub const HEIGHT: usize = 80;
pub const BACKGROUND: f32 = 100.0;
pub const AMPLITUDE: f32 = 1000.0;
pub const SIGMA: f64 = 2.0;

/// Flat background with a circular Gaussian star at `(cx, cy)`.
pub fn gaussian_plane(
    h: usize,
    w: usize,
    cx: f64,
    cy: f64,
    amplitude: f32,
    sigma: f64,
    background: f32,
) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(row, col)| {
        let dx = col as f64 - cx;
        let dy = row as f64 - cy;
        let g = (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        background + amplitude * g as f32
    })
}

/// Default-sized mono frame with one star.
pub fn star_frame(position: Position) -> PixelPlane {
    PixelPlane::mono(gaussian_plane(
        HEIGHT, WIDTH, position.x, position.y, AMPLITUDE, SIGMA, BACKGROUND,
    ))
}

/// Default-sized mono frame with no star.
pub fn flat_frame() -> PixelPlane {
    PixelPlane::mono(Array2::from_elem((HEIGHT, WIDTH), BACKGROUND))
}

/// RGB frame whose channels carry the star at different brightness.
pub fn rgb_star_frame(position: Position) -> PixelPlane {
    let channel = |scale: f32| {
        gaussian_plane(
            HEIGHT,
            WIDTH,
            position.x,
            position.y,
            AMPLITUDE * scale,
            SIGMA,
            BACKGROUND,
        )
    };
    PixelPlane::rgb(channel(1.0), channel(0.5), channel(0.25)).unwrap()
}

/// True positions of a star moving by `(dx, dy)` per frame.
pub fn drift_path(n: usize, start: Position, dx: f64, dy: f64) -> Vec<Position> {
    (0..n)
        .map(|i| start.offset(dx * i as f64, dy * i as f64))
        .collect()
}

/// Frames of a drifting star, with their true positions.
pub fn drifting_sequence(n: usize, start: Position, dx: f64, dy: f64) -> (Vec<PixelPlane>, Vec<Position>) {
    let path = drift_path(n, start, dx, dy);
    let frames = path.iter().map(|&p| star_frame(p)).collect();
    (frames, path)
}

pub fn assert_near(actual: Position, expected: Position, tolerance: f64) {
    let d = actual.distance(&expected);
    assert!(
        d <= tolerance,
        "expected {expected:?}, got {actual:?} (off by {d:.4})"
    );
}
