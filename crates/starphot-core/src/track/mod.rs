//! Star tracking: momentum history, search cutouts, centroid methods and the
//! tracker that combines them.

pub mod components;
pub mod consensus;
pub mod history;
pub mod methods;
pub mod region;
pub mod tracker;

pub use history::{HistoryEntry, TrackingHistory, Velocity};
pub use methods::{Candidate, CentroidMethod, MethodKind};
pub use region::SearchRegion;
pub use tracker::{CentroidTracker, TrackResult, TrackerConfig, TrackingStrategy};
