use std::borrow::Cow;
use std::fmt;

use ndarray::{Array2, ArrayView2, ArrayView3, Axis, Zip};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::consts::{COLOR_CHANNEL_COUNT, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{Result, StarphotError};

/// Sub-pixel position in image coordinates.
///
/// `x` is the column and `y` the row; integer values are pixel centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// A measured channel of a pixel plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Gray,
    Red,
    Green,
    Blue,
    /// Per-pixel mean of R, G and B.
    Luminance,
}

impl Channel {
    /// Short column prefix used in flattened result rows.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Red => "r",
            Self::Green => "g",
            Self::Blue => "b",
            Self::Luminance => "lum",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray => write!(f, "Gray"),
            Self::Red => write!(f, "Red"),
            Self::Green => write!(f, "Green"),
            Self::Blue => write!(f, "Blue"),
            Self::Luminance => write!(f, "Luminance"),
        }
    }
}

/// One decoded frame: a grayscale plane or three color planes.
/// Pixel data is row-major, shape = (height, width).
#[derive(Clone, Debug)]
pub enum PixelPlane {
    Mono(Array2<f32>),
    Rgb {
        red: Array2<f32>,
        green: Array2<f32>,
        blue: Array2<f32>,
    },
}

impl PixelPlane {
    pub fn mono(data: Array2<f32>) -> Self {
        Self::Mono(data)
    }

    /// Build an RGB plane. All three channels must share one shape.
    pub fn rgb(red: Array2<f32>, green: Array2<f32>, blue: Array2<f32>) -> Result<Self> {
        if red.dim() != green.dim() || red.dim() != blue.dim() {
            let (h, w) = red.dim();
            return Err(StarphotError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        Ok(Self::Rgb { red, green, blue })
    }

    /// Convert any numeric 2-D array to a mono plane.
    pub fn from_mono<T>(data: ArrayView2<'_, T>) -> Self
    where
        T: AsPrimitive<f32>,
    {
        Self::Mono(data.mapv(|v| v.as_()))
    }

    /// Convert a 3-D cube with a leading axis of length 3 to an RGB plane.
    pub fn from_cube<T>(cube: ArrayView3<'_, T>) -> Result<Self>
    where
        T: AsPrimitive<f32>,
    {
        let (channels, h, w) = cube.dim();
        if channels != COLOR_CHANNEL_COUNT {
            return Err(StarphotError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
        let plane = |i: usize| cube.index_axis(Axis(0), i).mapv(|v| v.as_());
        Self::rgb(plane(0), plane(1), plane(2))
    }

    /// Shape as (height, width).
    pub fn dim(&self) -> (usize, usize) {
        match self {
            Self::Mono(data) => data.dim(),
            Self::Rgb { red, .. } => red.dim(),
        }
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }

    pub fn is_rgb(&self) -> bool {
        matches!(self, Self::Rgb { .. })
    }

    /// The plane used for star tracking: mono data as-is, luminance for RGB.
    pub fn tracking_plane(&self) -> Cow<'_, Array2<f32>> {
        match self {
            Self::Mono(data) => Cow::Borrowed(data),
            Self::Rgb { red, green, blue } => Cow::Owned(luminance(red, green, blue)),
        }
    }

    /// Every measurable channel, in output order.
    pub fn channels(&self) -> Vec<(Channel, Cow<'_, Array2<f32>>)> {
        match self {
            Self::Mono(data) => vec![(Channel::Gray, Cow::Borrowed(data))],
            Self::Rgb { red, green, blue } => vec![
                (Channel::Red, Cow::Borrowed(red)),
                (Channel::Green, Cow::Borrowed(green)),
                (Channel::Blue, Cow::Borrowed(blue)),
                (Channel::Luminance, Cow::Owned(luminance(red, green, blue))),
            ],
        }
    }
}

/// Per-pixel mean of three color planes.
pub fn luminance(red: &Array2<f32>, green: &Array2<f32>, blue: &Array2<f32>) -> Array2<f32> {
    let zip = Zip::from(red).and(green).and(blue);
    if red.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(|&r, &g, &b| (r + g + b) / 3.0)
    } else {
        zip.map_collect(|&r, &g, &b| (r + g + b) / 3.0)
    }
}
