/// Processing phase, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStage {
    PreSelection,
    Measurement,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreSelection => write!(f, "Pre-selecting positions"),
            Self::Measurement => write!(f, "Measuring frames"),
        }
    }
}

/// Thread-safe progress reporting for session runs.
///
/// Implementors can drive progress bars, logging, or channel messages.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A run has started. `total_items` is the frame count of the sequence.
    fn begin_stage(&self, _stage: SessionStage, _total_items: Option<usize>) {}

    /// Frames up to `items_done` have been handled.
    fn advance(&self, _items_done: usize) {}

    /// The run reached the end of the sequence.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores every update.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
