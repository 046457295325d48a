/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of channels in a color frame (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-6;

/// Number of recent positions (and velocities) remembered by the tracker.
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

/// Number of most recent positions used for the adaptive search radius.
pub const ADAPTIVE_RADIUS_WINDOW: usize = 5;

/// Rejection threshold (in standard deviations) for sigma-clipped statistics.
pub const DEFAULT_CLIP_SIGMA: f64 = 3.0;

/// Maximum number of sigma-clipping iterations.
pub const DEFAULT_CLIP_ITERATIONS: usize = 10;

/// Threshold multiplier for bright stars: (peak - median) / std > 10.
pub const BRIGHT_STAR_MULTIPLIER: f64 = 2.0;

/// Threshold multiplier for moderate stars: (peak - median) / std > 5.
pub const MODERATE_STAR_MULTIPLIER: f64 = 2.5;

/// Threshold multiplier for faint stars.
pub const FAINT_STAR_MULTIPLIER: f64 = 3.0;

/// Brightness ratio above which a star counts as bright.
pub const BRIGHT_STAR_RATIO: f64 = 10.0;

/// Brightness ratio above which a star counts as moderate.
pub const MODERATE_STAR_RATIO: f64 = 5.0;

/// Confidence assigned to a center-of-mass centroid.
pub const CENTER_OF_MASS_CONFIDENCE: f64 = 0.8;

/// Confidence assigned to a peak + local refine centroid.
pub const PEAK_REFINE_CONFIDENCE: f64 = 0.6;

/// Confidence assigned to a successful Gaussian (log-paraboloid) fit.
pub const GAUSSIAN_FIT_CONFIDENCE: f64 = 0.8;

/// Confidence assigned to a pure momentum prediction.
pub const MOMENTUM_CONFIDENCE: f64 = 0.3;

/// Confidence recorded when tracking is lost.
pub const LOST_CONFIDENCE: f64 = 0.1;

/// Accepted centroids must lie within this multiple of the search radius.
pub const ACCEPTANCE_RADIUS_FACTOR: f64 = 1.5;

/// Accepted centroids must lie at least this many pixels from every edge.
pub const DEFAULT_EDGE_MARGIN: f64 = 5.0;

/// Half-width of the refinement window around the brightest pixel (11x11).
pub const PEAK_REFINE_HALF_WINDOW: usize = 5;

/// Smallest connected component (pixels) considered a star.
pub const MIN_COMPONENT_AREA: usize = 4;

/// Largest connected component (pixels) considered a star.
pub const MAX_COMPONENT_AREA: usize = 500;

/// Distance (pixels) at which connected-component confidence drops to zero.
pub const COMPONENT_CONFIDENCE_DISTANCE: f64 = 20.0;

/// Consensus scorer weights: method confidence, agreement, proximity.
pub const CONSENSUS_CONFIDENCE_WEIGHT: f64 = 0.5;
pub const CONSENSUS_AGREEMENT_WEIGHT: f64 = 0.3;
pub const CONSENSUS_PROXIMITY_WEIGHT: f64 = 0.2;

/// Distance to the median candidate at which the agreement score is zero.
pub const CONSENSUS_AGREEMENT_DISTANCE: f64 = 5.0;

/// Default signal aperture radius in pixels.
pub const DEFAULT_INNER_RADIUS: f64 = 9.0;

/// Default inner radius of the sky annulus in pixels.
pub const DEFAULT_INNER_ANNULUS: f64 = 12.0;

/// Default outer radius of the sky annulus in pixels.
pub const DEFAULT_OUTER_ANNULUS: f64 = 17.0;

/// Default tracking search radius in pixels.
pub const DEFAULT_SEARCH_RADIUS: f64 = 25.0;

/// Sleep interval for a paused batch worker between flag checks.
pub const PAUSE_POLL_INTERVAL_MS: u64 = 100;
