//! Per-star workflow: pre-selection, sequential and batch measurement,
//! pause and retroactive correction.

pub mod config;
pub mod progress;
pub mod records;
pub mod types;
pub mod workflow;

pub use config::{FailurePolicy, SessionConfig};
pub use progress::{NoOpReporter, ProgressReporter, SessionStage};
pub use records::{
    position_records, positions_from_records, PositionRecord, ResultRow, PRESELECTED_POSITION_TYPE,
    SEQUENTIAL_POSITION_TYPE,
};
pub use types::{
    DecisionReason, FailureKind, FrameFailure, PendingDecision, PhotometryResult, Resolution,
    RunOutcome, SessionControls, SessionMode, SessionReport, StepOutcome,
};
pub use workflow::WorkflowSession;
