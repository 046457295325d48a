use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SEARCH_RADIUS;
use crate::error::Result;
use crate::photometry::{ApertureParams, ApertureSampling};
use crate::track::TrackerConfig;

/// What a batch run does with a frame that cannot be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure and continue with the next frame.
    #[default]
    Skip,
    /// Stop at the frame and wait for a skip, retry or stop decision.
    Ask,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "Skip"),
            Self::Ask => write!(f, "Ask"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Identifier of the measured star, copied into every record.
    pub star_name: String,
    pub aperture: ApertureParams,
    /// Baseline tracking search radius in pixels.
    pub search_radius: f64,
    /// Track the star automatically and refine externally supplied positions.
    pub auto_tracking: bool,
    pub tracker: TrackerConfig,
    pub aperture_sampling: ApertureSampling,
    pub decode_failure: FailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            star_name: String::new(),
            aperture: ApertureParams::default(),
            search_radius: DEFAULT_SEARCH_RADIUS,
            auto_tracking: true,
            tracker: TrackerConfig::default(),
            aperture_sampling: ApertureSampling::default(),
            decode_failure: FailurePolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.aperture.validate()
    }
}
