use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_EDGE_MARGIN, DEFAULT_HISTORY_CAPACITY, LOST_CONFIDENCE, MOMENTUM_CONFIDENCE,
};
use crate::frame::{PixelPlane, Position};
use crate::track::consensus::select_best;
use crate::track::history::TrackingHistory;
use crate::track::methods::{
    consensus_methods, sequential_methods, Candidate, CentroidMethod, MethodKind,
};
use crate::track::region::SearchRegion;

/// How centroid methods are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStrategy {
    /// Center of mass, then peak refine; first accepted result wins.
    #[default]
    Sequential,
    /// Every method runs; accepted candidates are scored against each other.
    Consensus,
}

impl fmt::Display for TrackingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "Sequential"),
            Self::Consensus => write!(f, "Consensus"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub strategy: TrackingStrategy,
    /// Positions (and velocities) remembered for momentum prediction.
    pub history_capacity: usize,
    /// Accepted centroids must be farther than this from every plane edge.
    pub edge_margin: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            strategy: TrackingStrategy::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            edge_margin: DEFAULT_EDGE_MARGIN,
        }
    }
}

/// Outcome of one tracking attempt. Loss is a normal outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrackResult {
    Found {
        position: Position,
        confidence: f64,
        method: MethodKind,
    },
    Lost {
        expected: Position,
    },
}

impl TrackResult {
    /// The tracked position, or the expected one when lost.
    pub fn position(&self) -> Position {
        match self {
            Self::Found { position, .. } => *position,
            Self::Lost { expected } => *expected,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Found { confidence, .. } => *confidence,
            Self::Lost { .. } => LOST_CONFIDENCE,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    fn from_candidate(c: Candidate) -> Self {
        Self::Found {
            position: c.position,
            confidence: c.confidence,
            method: c.method,
        }
    }
}

/// Re-locates a star near an expected position, frame after frame.
///
/// Owns the tracking history, so one tracker serves one star in one session.
pub struct CentroidTracker {
    config: TrackerConfig,
    history: TrackingHistory,
    methods: Vec<Box<dyn CentroidMethod>>,
}

impl fmt::Debug for CentroidTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentroidTracker")
            .field("config", &self.config)
            .field("history", &self.history)
            .field(
                "methods",
                &self.methods.iter().map(|m| m.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let methods = match config.strategy {
            TrackingStrategy::Sequential => sequential_methods(),
            TrackingStrategy::Consensus => consensus_methods(),
        };
        Self::with_methods(config, methods)
    }

    /// Tracker with a custom method list. The list is tried in order by the
    /// sequential strategy and scored as a whole by the consensus strategy.
    pub fn with_methods(config: TrackerConfig, methods: Vec<Box<dyn CentroidMethod>>) -> Self {
        Self {
            history: TrackingHistory::new(config.history_capacity),
            config,
            methods,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn history(&self) -> &TrackingHistory {
        &self.history
    }

    /// Forget all recorded positions.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Locate the star in a frame, tracking on its luminance if RGB.
    pub fn locate(&mut self, plane: &PixelPlane, expected: Position, base_radius: f64) -> TrackResult {
        let data = plane.tracking_plane();
        self.locate_in(&data, expected, base_radius)
    }

    /// Locate the star in a single 2-D plane.
    ///
    /// The returned position (tracked, predicted, or the expected one when
    /// lost) is always recorded in the history.
    pub fn locate_in(&mut self, data: &Array2<f32>, expected: Position, base_radius: f64) -> TrackResult {
        let result = self.attempt(data, expected, base_radius);
        self.history.push(result.position(), result.confidence());
        match &result {
            TrackResult::Found {
                position,
                confidence,
                method,
            } => debug!(
                %method,
                %position,
                confidence,
                moved = position.distance(&expected),
                "Tracked star"
            ),
            TrackResult::Lost { expected } => {
                debug!(%expected, "Tracking failed, keeping expected position")
            }
        }
        result
    }

    fn attempt(&self, data: &Array2<f32>, expected: Position, base_radius: f64) -> TrackResult {
        let predicted = self.history.predict(expected);
        let radius = self.history.adaptive_radius(base_radius);

        let Some(region) = SearchRegion::extract(data, expected, predicted, radius) else {
            return TrackResult::Lost { expected };
        };

        let margin = self.config.edge_margin;
        let found = match self.config.strategy {
            TrackingStrategy::Sequential => self
                .methods
                .iter()
                .filter_map(|m| m.locate(&region))
                .find(|c| region.accepts(&c.position, margin)),
            TrackingStrategy::Consensus => {
                let accepted: Vec<Candidate> = self
                    .methods
                    .iter()
                    .filter_map(|m| m.locate(&region))
                    .filter(|c| region.accepts(&c.position, margin))
                    .collect();
                select_best(&accepted, &region.center, region.radius)
            }
        };
        if let Some(c) = found {
            return TrackResult::from_candidate(c);
        }

        if predicted != expected && predicted.distance(&expected) <= radius {
            return TrackResult::Found {
                position: predicted,
                confidence: MOMENTUM_CONFIDENCE,
                method: MethodKind::Momentum,
            };
        }

        TrackResult::Lost { expected }
    }
}
