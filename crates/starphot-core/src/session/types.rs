use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::frame::Position;
use crate::photometry::{ApertureParams, ChannelMeasurement};
use crate::session::progress::SessionStage;
use crate::track::MethodKind;

/// Workflow mode of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    Idle,
    PreSelecting,
    SequentialManual,
    BatchAutomatic,
    Paused,
}

impl SessionMode {
    /// Modes that process frames.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::PreSelecting | Self::SequentialManual | Self::BatchAutomatic
        )
    }

    pub fn stage(&self) -> Option<SessionStage> {
        match self {
            Self::PreSelecting => Some(SessionStage::PreSelection),
            Self::SequentialManual | Self::BatchAutomatic => Some(SessionStage::Measurement),
            Self::Idle | Self::Paused => None,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::PreSelecting => write!(f, "Pre-selecting"),
            Self::SequentialManual => write!(f, "Sequential manual"),
            Self::BatchAutomatic => write!(f, "Batch automatic"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

/// Photometry of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotometryResult {
    pub frame_index: usize,
    /// Frame label from the source, usually a file name.
    pub label: String,
    pub position: Position,
    /// Distance from the most recent earlier positioned frame.
    pub movement: f64,
    pub aperture: ApertureParams,
    pub is_rgb: bool,
    pub channels: Vec<ChannelMeasurement>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    TrackingLost,
    FrameDecodeFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackingLost => write!(f, "Tracking lost"),
            Self::FrameDecodeFailed => write!(f, "Frame decode failed"),
        }
    }
}

/// A recoverable per-frame failure kept for the session report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameFailure {
    pub frame_index: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Why a session stopped to wait for the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecisionReason {
    /// The first frame needs a position from the caller.
    AnchorRequired,
    /// The frame needs a position from the caller.
    PositionRequired,
    /// The tracker lost the star near `expected`.
    TrackingLost { expected: Position },
    /// The frame could not be decoded and the failure policy asks.
    FrameDecodeFailed,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorRequired => write!(f, "anchor position required"),
            Self::PositionRequired => write!(f, "position required"),
            Self::TrackingLost { expected } => write!(f, "tracking lost near {expected}"),
            Self::FrameDecodeFailed => write!(f, "frame could not be decoded"),
        }
    }
}

/// A decision the caller must make before the session can continue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingDecision {
    pub frame_index: usize,
    pub reason: DecisionReason,
}

/// The caller's answer to a [`PendingDecision`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// Use this position (refined by the tracker when auto-tracking is on).
    Position(Position),
    /// Leave the frame without a position and continue.
    Skip,
    /// Load the frame again (decode failures only).
    Retry,
    /// Pause the session at this frame.
    Stop,
}

/// Result of processing a single frame.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// A position was stored for the frame.
    Positioned {
        frame_index: usize,
        position: Position,
        /// Tracking method, or `None` for a caller-supplied position.
        method: Option<MethodKind>,
    },
    /// The frame was measured and its result appended.
    Measured(PhotometryResult),
    /// The frame was passed over without a position.
    Skipped { frame_index: usize },
    AwaitingDecision(PendingDecision),
    /// The session was paused by a stop directive.
    Interrupted { frame_index: usize },
    /// Every frame has been handled; the session is idle again.
    Complete,
}

/// How a [`run`](crate::session::WorkflowSession::run) ended.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Complete,
    AwaitingDecision(PendingDecision),
    /// A stop was requested; the session is paused and can resume.
    Interrupted { frame_index: usize },
    /// A pause was requested; the session is paused at a frame boundary.
    Paused { frame_index: usize },
}

/// Shared flags for controlling a running session from another thread.
/// Checked only at frame boundaries.
#[derive(Clone, Debug, Default)]
pub struct SessionControls {
    stop: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
}

impl SessionControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn clear_pause(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.stop.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
    }
}

/// Summary handed to the result sink when a session stops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub star_name: String,
    pub frame_count: usize,
    /// Frames that have a position.
    pub positioned: usize,
    /// Frames that have a photometry result.
    pub measured: usize,
    pub failures: Vec<FrameFailure>,
    /// Mode the session was in when the report was taken.
    pub final_mode: SessionMode,
    /// True when the last started phase ran to the end of the sequence.
    pub completed: bool,
}
