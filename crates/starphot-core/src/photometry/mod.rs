//! Aperture photometry with sigma-clipped sky subtraction.

pub mod aperture;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use aperture::{aperture_sum, collect_annulus_pixels, ApertureParams, ApertureSampling};

use crate::error::Result;
use crate::frame::{Channel, PixelPlane, Position};
use crate::stats::{sigma_clipped_stats, SigmaClipParams};

/// Photometry of one channel at one position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeasurement {
    pub channel: Channel,
    /// Sum of the pixels inside the signal aperture.
    pub raw_flux: f64,
    /// Sigma-clipped median of the annulus, per pixel.
    pub sky_median: f64,
    pub sky_std: f64,
    /// `sky_median * aperture_area`.
    pub background_total: f64,
    pub corrected_flux: f64,
    /// `sqrt(max(raw_flux, 0))`.
    pub poisson_noise: f64,
    /// Analytic aperture area, `pi * r^2`.
    pub aperture_area: f64,
    /// Annulus pixels that survived clipping.
    pub annulus_pixels: usize,
}

/// Sky-corrected flux derived from a raw aperture sum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundCorrection {
    pub background_total: f64,
    pub corrected_flux: f64,
    pub poisson_noise: f64,
}

/// Subtract `sky_median * pi * r^2` from `raw_flux`; noise is taken from the
/// raw counts.
pub fn correct_background(raw_flux: f64, sky_median: f64, inner_radius: f64) -> BackgroundCorrection {
    let area = std::f64::consts::PI * inner_radius * inner_radius;
    let background_total = sky_median * area;
    BackgroundCorrection {
        background_total,
        corrected_flux: raw_flux - background_total,
        poisson_noise: raw_flux.max(0.0).sqrt(),
    }
}

/// Measures every channel of a plane with fixed aperture geometry.
#[derive(Clone, Debug)]
pub struct AperturePhotometer {
    params: ApertureParams,
    sampling: ApertureSampling,
    clip: SigmaClipParams,
}

impl AperturePhotometer {
    /// Fails with `InvalidAperture` for a non-positive signal radius.
    pub fn new(params: ApertureParams, sampling: ApertureSampling) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            sampling,
            clip: SigmaClipParams::default(),
        })
    }

    pub fn params(&self) -> &ApertureParams {
        &self.params
    }

    pub fn sampling(&self) -> ApertureSampling {
        self.sampling
    }

    /// One measurement per channel: Gray for mono planes; Red, Green, Blue
    /// and Luminance for RGB planes.
    pub fn measure(&self, plane: &PixelPlane, position: Position) -> Vec<ChannelMeasurement> {
        plane
            .channels()
            .into_par_iter()
            .map(|(channel, data)| self.measure_channel(channel, &data, position))
            .collect()
    }

    pub fn measure_channel(
        &self,
        channel: Channel,
        data: &Array2<f32>,
        position: Position,
    ) -> ChannelMeasurement {
        let p = &self.params;
        let raw_flux = aperture_sum(data.view(), &position, p.inner_radius, self.sampling);
        let aperture_area = p.aperture_area();

        if !p.sky_enabled() {
            return ChannelMeasurement {
                channel,
                raw_flux,
                sky_median: 0.0,
                sky_std: 0.0,
                background_total: 0.0,
                corrected_flux: raw_flux,
                poisson_noise: raw_flux.max(0.0).sqrt(),
                aperture_area,
                annulus_pixels: 0,
            };
        }

        let annulus = collect_annulus_pixels(data.view(), &position, p.inner_annulus, p.outer_annulus);
        let (sky_median, sky_std, annulus_pixels) = match sigma_clipped_stats(&annulus, &self.clip) {
            Some(stats) => (stats.median, stats.std, stats.count),
            None => {
                warn!(%channel, %position, "Sky annulus has no pixels, assuming zero background");
                (0.0, 0.0, 0)
            }
        };

        let correction = correct_background(raw_flux, sky_median, p.inner_radius);
        ChannelMeasurement {
            channel,
            raw_flux,
            sky_median,
            sky_std,
            background_total: correction.background_total,
            corrected_flux: correction.corrected_flux,
            poisson_noise: correction.poisson_noise,
            aperture_area,
            annulus_pixels,
        }
    }
}

/// Measure a plane with center sampling.
pub fn measure(plane: &PixelPlane, position: Position, params: ApertureParams) -> Result<Vec<ChannelMeasurement>> {
    let photometer = AperturePhotometer::new(params, ApertureSampling::Center)?;
    Ok(photometer.measure(plane, position))
}
