//! Flat records for persisting positions and results.
//!
//! Serialization itself belongs to the caller; these types only carry the
//! column layout.

use serde::{Deserialize, Serialize};

use crate::frame::{Channel, Position};
use crate::photometry::{ApertureParams, ChannelMeasurement};
use crate::session::types::PhotometryResult;
use crate::session::workflow::WorkflowSession;
use crate::source::FrameSource;

/// Position type written for positions collected by pre-selection.
pub const PRESELECTED_POSITION_TYPE: &str = "pre-selected";

/// Position type written for positions supplied frame by frame.
pub const SEQUENTIAL_POSITION_TYPE: &str = "sequential";

/// One saved star position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub image_index: usize,
    pub filename: String,
    pub star_name: String,
    pub x_position: f64,
    pub y_position: f64,
    pub position_type: String,
    pub aperture_inner_radius: f64,
    pub aperture_inner_annulus: f64,
    pub aperture_outer_annulus: f64,
}

impl PositionRecord {
    pub fn position(&self) -> Position {
        Position::new(self.x_position, self.y_position)
    }

    pub fn aperture(&self) -> ApertureParams {
        ApertureParams::new(
            self.aperture_inner_radius,
            self.aperture_inner_annulus,
            self.aperture_outer_annulus,
        )
    }
}

/// One record per positioned frame, in frame order.
pub fn position_records(
    session: &WorkflowSession,
    source: &dyn FrameSource,
    position_type: &str,
) -> Vec<PositionRecord> {
    let config = session.config();
    session
        .positions()
        .iter()
        .enumerate()
        .filter_map(|(index, p)| p.map(|p| (index, p)))
        .map(|(index, p)| PositionRecord {
            image_index: index,
            filename: source.label(index),
            star_name: config.star_name.clone(),
            x_position: p.x,
            y_position: p.y,
            position_type: position_type.to_string(),
            aperture_inner_radius: config.aperture.inner_radius,
            aperture_inner_annulus: config.aperture.inner_annulus,
            aperture_outer_annulus: config.aperture.outer_annulus,
        })
        .collect()
}

/// Per-frame positions rebuilt from records. Frames without a record stay
/// `None`; records at or beyond `frame_count` are ignored.
pub fn positions_from_records(records: &[PositionRecord], frame_count: usize) -> Vec<Option<Position>> {
    let len = records
        .iter()
        .map(|r| r.image_index + 1)
        .filter(|&n| n <= frame_count)
        .max()
        .unwrap_or(0);
    let mut positions = vec![None; len];
    for r in records.iter().filter(|r| r.image_index < frame_count) {
        positions[r.image_index] = Some(r.position());
    }
    positions
}

/// Photometry of one channel, flattened into optional columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelColumns {
    pub star_flux_raw: Option<f64>,
    pub sky_per_pixel: Option<f64>,
    pub sky_std: Option<f64>,
    pub sky_background_total: Option<f64>,
    pub flux_corrected: Option<f64>,
    pub poisson_noise: Option<f64>,
}

impl From<&ChannelMeasurement> for ChannelColumns {
    fn from(m: &ChannelMeasurement) -> Self {
        Self {
            star_flux_raw: Some(m.raw_flux),
            sky_per_pixel: Some(m.sky_median),
            sky_std: Some(m.sky_std),
            sky_background_total: Some(m.background_total),
            flux_corrected: Some(m.corrected_flux),
            poisson_noise: Some(m.poisson_noise),
        }
    }
}

/// One photometry result as a flat table row. Channels absent from the
/// frame leave their columns empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub image_index: usize,
    pub filename: String,
    pub star_name: String,
    pub x_position: f64,
    pub y_position: f64,
    pub movement_pixels: f64,
    pub is_rgb: bool,
    pub aperture_inner_radius: f64,
    pub aperture_inner_annulus: f64,
    pub aperture_outer_annulus: f64,
    pub aperture_area: f64,
    pub gray_star_flux_raw: Option<f64>,
    pub gray_sky_per_pixel: Option<f64>,
    pub gray_sky_std: Option<f64>,
    pub gray_sky_background_total: Option<f64>,
    pub gray_flux_corrected: Option<f64>,
    pub gray_poisson_noise: Option<f64>,
    pub r_star_flux_raw: Option<f64>,
    pub r_sky_per_pixel: Option<f64>,
    pub r_sky_std: Option<f64>,
    pub r_sky_background_total: Option<f64>,
    pub r_flux_corrected: Option<f64>,
    pub r_poisson_noise: Option<f64>,
    pub g_star_flux_raw: Option<f64>,
    pub g_sky_per_pixel: Option<f64>,
    pub g_sky_std: Option<f64>,
    pub g_sky_background_total: Option<f64>,
    pub g_flux_corrected: Option<f64>,
    pub g_poisson_noise: Option<f64>,
    pub b_star_flux_raw: Option<f64>,
    pub b_sky_per_pixel: Option<f64>,
    pub b_sky_std: Option<f64>,
    pub b_sky_background_total: Option<f64>,
    pub b_flux_corrected: Option<f64>,
    pub b_poisson_noise: Option<f64>,
    pub lum_star_flux_raw: Option<f64>,
    pub lum_sky_per_pixel: Option<f64>,
    pub lum_sky_std: Option<f64>,
    pub lum_sky_background_total: Option<f64>,
    pub lum_flux_corrected: Option<f64>,
    pub lum_poisson_noise: Option<f64>,
}

impl ResultRow {
    pub fn new(result: &PhotometryResult, star_name: &str) -> Self {
        let columns = |channel: Channel| {
            result
                .channels
                .iter()
                .find(|m| m.channel == channel)
                .map(ChannelColumns::from)
                .unwrap_or_default()
        };
        let gray = columns(Channel::Gray);
        let r = columns(Channel::Red);
        let g = columns(Channel::Green);
        let b = columns(Channel::Blue);
        let lum = columns(Channel::Luminance);

        Self {
            image_index: result.frame_index,
            filename: result.label.clone(),
            star_name: star_name.to_string(),
            x_position: result.position.x,
            y_position: result.position.y,
            movement_pixels: result.movement,
            is_rgb: result.is_rgb,
            aperture_inner_radius: result.aperture.inner_radius,
            aperture_inner_annulus: result.aperture.inner_annulus,
            aperture_outer_annulus: result.aperture.outer_annulus,
            aperture_area: result.aperture.aperture_area(),
            gray_star_flux_raw: gray.star_flux_raw,
            gray_sky_per_pixel: gray.sky_per_pixel,
            gray_sky_std: gray.sky_std,
            gray_sky_background_total: gray.sky_background_total,
            gray_flux_corrected: gray.flux_corrected,
            gray_poisson_noise: gray.poisson_noise,
            r_star_flux_raw: r.star_flux_raw,
            r_sky_per_pixel: r.sky_per_pixel,
            r_sky_std: r.sky_std,
            r_sky_background_total: r.sky_background_total,
            r_flux_corrected: r.flux_corrected,
            r_poisson_noise: r.poisson_noise,
            g_star_flux_raw: g.star_flux_raw,
            g_sky_per_pixel: g.sky_per_pixel,
            g_sky_std: g.sky_std,
            g_sky_background_total: g.sky_background_total,
            g_flux_corrected: g.flux_corrected,
            g_poisson_noise: g.poisson_noise,
            b_star_flux_raw: b.star_flux_raw,
            b_sky_per_pixel: b.sky_per_pixel,
            b_sky_std: b.sky_std,
            b_sky_background_total: b.sky_background_total,
            b_flux_corrected: b.flux_corrected,
            b_poisson_noise: b.poisson_noise,
            lum_star_flux_raw: lum.star_flux_raw,
            lum_sky_per_pixel: lum.sky_per_pixel,
            lum_sky_std: lum.sky_std,
            lum_sky_background_total: lum.sky_background_total,
            lum_flux_corrected: lum.flux_corrected,
            lum_poisson_noise: lum.poisson_noise,
        }
    }
}
