use tracing::{debug, info, warn};

use crate::error::{Result, StarphotError};
use crate::frame::{PixelPlane, Position};
use crate::photometry::AperturePhotometer;
use crate::session::config::{FailurePolicy, SessionConfig};
use crate::session::progress::ProgressReporter;
use crate::session::types::{
    DecisionReason, FailureKind, FrameFailure, PendingDecision, PhotometryResult, Resolution,
    RunOutcome, SessionControls, SessionMode, SessionReport, StepOutcome,
};
use crate::source::{FrameSource, ResultSink};
use crate::track::{CentroidTracker, TrackResult};

/// Outcome of loading a frame inside a step.
enum Loaded {
    Plane(PixelPlane),
    /// The frame failed to decode and the failure was handled.
    Handled(StepOutcome),
}

/// Per-star processing state across a frame sequence.
///
/// Holds the per-frame positions, the photometry results computed from
/// them, recoverable failures and the pending decision, if any. Results are
/// only ever computed from the position currently stored for their frame.
#[derive(Debug)]
pub struct WorkflowSession {
    config: SessionConfig,
    photometer: AperturePhotometer,
    tracker: CentroidTracker,
    mode: SessionMode,
    paused_from: Option<SessionMode>,
    current_frame_index: usize,
    view_index: usize,
    frame_count: usize,
    positions: Vec<Option<Position>>,
    /// Exclusive end of the frames a batch run measures.
    batch_end: usize,
    results: Vec<PhotometryResult>,
    failures: Vec<FrameFailure>,
    pending: Option<PendingDecision>,
    controls: SessionControls,
    completed: bool,
    frozen: bool,
}

impl WorkflowSession {
    /// Empty session over `frame_count` frames.
    pub fn new(config: SessionConfig, frame_count: usize) -> Result<Self> {
        if frame_count == 0 {
            return Err(StarphotError::EmptySequence);
        }
        config.validate()?;
        let photometer = AperturePhotometer::new(config.aperture, config.aperture_sampling)?;
        let tracker = CentroidTracker::new(config.tracker.clone());
        Ok(Self {
            config,
            photometer,
            tracker,
            mode: SessionMode::Idle,
            paused_from: None,
            current_frame_index: 0,
            view_index: 0,
            frame_count,
            positions: Vec::new(),
            batch_end: 0,
            results: Vec::new(),
            failures: Vec::new(),
            pending: None,
            controls: SessionControls::new(),
            completed: false,
            frozen: false,
        })
    }

    /// Session seeded with previously saved positions, ready for a batch
    /// replay without re-tracking.
    pub fn from_positions(
        config: SessionConfig,
        frame_count: usize,
        positions: Vec<Option<Position>>,
    ) -> Result<Self> {
        if positions.len() > frame_count {
            return Err(StarphotError::FrameIndexOutOfRange {
                index: positions.len() - 1,
                total: frame_count,
            });
        }
        let mut session = Self::new(config, frame_count)?;
        session.positions = positions;
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Accessors

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The mode a paused session resumes into.
    pub fn paused_from(&self) -> Option<SessionMode> {
        self.paused_from
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    /// Frame shown while paused. Navigation moves only this cursor.
    pub fn view_index(&self) -> usize {
        self.view_index
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn positions(&self) -> &[Option<Position>] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<Position> {
        self.positions.get(index).copied().flatten()
    }

    pub fn results(&self) -> &[PhotometryResult] {
        &self.results
    }

    pub fn result(&self, index: usize) -> Option<&PhotometryResult> {
        self.results.iter().find(|r| r.frame_index == index)
    }

    pub fn failures(&self) -> &[FrameFailure] {
        &self.failures
    }

    pub fn pending(&self) -> Option<&PendingDecision> {
        self.pending.as_ref()
    }

    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    /// Handle for requesting a pause or stop from another thread.
    pub fn controls(&self) -> SessionControls {
        self.controls.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Snapshot summary of the session.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            star_name: self.config.star_name.clone(),
            frame_count: self.frame_count,
            positioned: self.positions.iter().flatten().count(),
            measured: self.results.len(),
            failures: self.failures.clone(),
            final_mode: self.mode,
            completed: self.completed,
        }
    }

    /// True when every result has strictly increasing frame index, matches
    /// the position currently stored for its frame, and there are no more
    /// results than positioned frames.
    pub fn check_consistency(&self) -> bool {
        let mut previous: Option<usize> = None;
        for r in &self.results {
            if previous.is_some_and(|p| p >= r.frame_index) {
                return false;
            }
            if self.position(r.frame_index) != Some(r.position) {
                return false;
            }
            previous = Some(r.frame_index);
        }
        self.results.len() <= self.positions.iter().flatten().count()
    }

    // -----------------------------------------------------------------------
    // Mode transitions

    /// Collect positions for every frame, tracking from the last known one.
    pub fn start_preselection(&mut self) -> Result<()> {
        self.begin("start pre-selection", SessionMode::PreSelecting)
    }

    /// Measure each frame as soon as its position is supplied.
    pub fn start_sequential(&mut self) -> Result<()> {
        self.begin("start sequential tracking", SessionMode::SequentialManual)?;
        self.results.clear();
        self.failures.retain(|f| f.kind != FailureKind::FrameDecodeFailed);
        Ok(())
    }

    /// Measure every positioned frame. Needs a position for the first frame.
    /// Previous results are discarded, so repeated runs over unchanged
    /// positions give identical results.
    pub fn start_batch(&mut self) -> Result<()> {
        self.ensure_not_frozen()?;
        if self.position(0).is_none() {
            return Err(StarphotError::AnchorMissing);
        }
        self.begin("start batch processing", SessionMode::BatchAutomatic)?;
        self.batch_end = self.frame_count.min(self.positions.len());
        self.results.clear();
        self.failures.retain(|f| f.kind != FailureKind::FrameDecodeFailed);
        Ok(())
    }

    fn begin(&mut self, operation: &'static str, mode: SessionMode) -> Result<()> {
        self.ensure_not_frozen()?;
        if self.mode != SessionMode::Idle {
            return Err(self.invalid_state(operation));
        }
        self.mode = mode;
        self.paused_from = None;
        self.current_frame_index = 0;
        self.view_index = 0;
        self.pending = None;
        self.completed = false;
        self.controls.reset();
        self.tracker.reset();
        info!(%mode, frames = self.frame_count, star = %self.config.star_name, "Session started");
        Ok(())
    }

    /// Freeze `current_frame_index` and remember the mode to resume into.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_not_frozen()?;
        if !self.mode.is_active() {
            return Err(self.invalid_state("pause"));
        }
        self.pause_at_boundary();
        Ok(())
    }

    fn pause_at_boundary(&mut self) {
        if !self.mode.is_active() {
            return;
        }
        self.paused_from = Some(self.mode);
        self.mode = SessionMode::Paused;
        self.view_index = self.current_frame_index.min(self.frame_count - 1);
        info!(frame = self.current_frame_index, "Session paused");
    }

    /// Re-enter the paused mode at `current_frame_index`.
    pub fn resume(&mut self) -> Result<()> {
        self.ensure_not_frozen()?;
        if self.mode != SessionMode::Paused {
            return Err(self.invalid_state("resume"));
        }
        self.mode = self.paused_from.take().unwrap_or(SessionMode::Idle);
        self.view_index = self.current_frame_index.min(self.frame_count - 1);
        self.controls.reset();
        info!(mode = %self.mode, frame = self.current_frame_index, "Session resumed");
        Ok(())
    }

    /// Move the inspection cursor while paused. Returns the new view index.
    pub fn navigate(&mut self, delta: isize) -> Result<usize> {
        self.ensure_not_frozen()?;
        if self.mode != SessionMode::Paused {
            return Err(self.invalid_state("navigate"));
        }
        let last = self.frame_count as isize - 1;
        self.view_index = (self.view_index as isize + delta).clamp(0, last) as usize;
        Ok(self.view_index)
    }

    /// Replace the position of frame `index` while paused.
    ///
    /// Every later position, and every result and failure from `index` on,
    /// is discarded. The new position is refined first when auto-tracking is
    /// on. Resuming re-processes from `index` (or from the current frame, if
    /// that is earlier). A paused batch run re-tracks the discarded frames
    /// from the new position before measuring them.
    ///
    /// When `index` lies ahead of the current frame and tracking resumes
    /// before it, the tracker history is left as it was; otherwise it
    /// restarts from the new position.
    pub fn overwrite_position(
        &mut self,
        index: usize,
        position: Position,
        source: &dyn FrameSource,
    ) -> Result<Position> {
        self.ensure_not_frozen()?;
        if self.mode != SessionMode::Paused {
            return Err(self.invalid_state("overwrite a position"));
        }
        if index >= self.frame_count {
            return Err(StarphotError::FrameIndexOutOfRange {
                index,
                total: self.frame_count,
            });
        }

        self.positions.truncate(index + 1);
        self.results.retain(|r| r.frame_index < index);
        self.failures.retain(|f| f.frame_index < index);
        if self.pending.is_some_and(|p| p.frame_index >= index) {
            self.pending = None;
        }

        let batch = self.paused_from == Some(SessionMode::BatchAutomatic);
        let ahead = index > self.current_frame_index && !batch;
        let mut scratch = CentroidTracker::new(self.config.tracker.clone());
        if !ahead {
            self.tracker.reset();
        }
        let accepted = if self.config.auto_tracking {
            match source.load(index) {
                Ok(plane) => {
                    let tracker = if ahead { &mut scratch } else { &mut self.tracker };
                    refine_with(tracker, &self.config, &plane, position)
                }
                Err(e) => {
                    warn!(frame = index, error = %e, "Cannot refine overwritten position");
                    position
                }
            }
        } else {
            position
        };

        self.set_position(index, Some(accepted));
        if batch {
            self.batch_end = self.batch_end.max(index + 1);
        }
        self.current_frame_index = self.current_frame_index.min(index);
        self.view_index = index;
        self.completed = false;
        info!(frame = index, position = %accepted, "Position overwritten, later frames invalidated");
        Ok(accepted)
    }

    /// Freeze the session and hand its results to `sink`.
    pub fn stop(&mut self, sink: &mut dyn ResultSink) -> Result<SessionReport> {
        self.ensure_not_frozen()?;
        self.controls.request_stop();
        self.pending = None;
        let report = self.report();
        self.mode = SessionMode::Idle;
        self.paused_from = None;
        self.frozen = true;

        for result in &self.results {
            sink.accept(result)?;
        }
        sink.finish(&report)?;
        info!(
            measured = report.measured,
            failures = report.failures.len(),
            "Session stopped"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Processing

    /// Process frames until the phase completes, a decision is needed, or a
    /// pause or stop is requested through [`SessionControls`].
    pub fn run(
        &mut self,
        source: &dyn FrameSource,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        self.ensure_not_frozen()?;
        let Some(stage) = self.mode.stage() else {
            return Err(self.invalid_state("run"));
        };

        reporter.begin_stage(stage, Some(self.frame_count));
        reporter.advance(self.current_frame_index);
        loop {
            if self.controls.is_stop_requested() {
                self.pause_at_boundary();
                info!(frame = self.current_frame_index, "Run interrupted");
                return Ok(RunOutcome::Interrupted {
                    frame_index: self.current_frame_index,
                });
            }
            if self.controls.is_pause_requested() {
                self.pause_at_boundary();
                return Ok(RunOutcome::Paused {
                    frame_index: self.current_frame_index,
                });
            }

            let outcome = self.step(source)?;
            reporter.advance(self.current_frame_index.min(self.frame_count));
            match outcome {
                StepOutcome::Complete => {
                    reporter.finish_stage();
                    return Ok(RunOutcome::Complete);
                }
                StepOutcome::AwaitingDecision(decision) => {
                    return Ok(RunOutcome::AwaitingDecision(decision));
                }
                StepOutcome::Interrupted { frame_index } => {
                    return Ok(RunOutcome::Interrupted { frame_index });
                }
                _ => {}
            }
        }
    }

    /// Process the frame at `current_frame_index`.
    ///
    /// While a decision is pending, returns it again without doing anything.
    pub fn step(&mut self, source: &dyn FrameSource) -> Result<StepOutcome> {
        self.ensure_not_frozen()?;
        if let Some(pending) = self.pending {
            return Ok(StepOutcome::AwaitingDecision(pending));
        }
        match self.mode {
            SessionMode::PreSelecting => self.step_preselection(source),
            SessionMode::SequentialManual => self.step_sequential(source),
            SessionMode::BatchAutomatic => self.step_batch(source),
            SessionMode::Idle | SessionMode::Paused => Err(self.invalid_state("process a frame")),
        }
    }

    fn step_preselection(&mut self, source: &dyn FrameSource) -> Result<StepOutcome> {
        while self.current_frame_index < self.frame_count
            && self.position(self.current_frame_index).is_some()
        {
            debug!(frame = self.current_frame_index, "Frame already positioned");
            self.advance();
        }
        if self.current_frame_index >= self.frame_count {
            return Ok(self.complete_phase());
        }

        let index = self.current_frame_index;
        let anchor = if index > 0 && self.config.auto_tracking {
            self.last_known_before(index)
        } else {
            None
        };
        let Some(anchor) = anchor else {
            let reason = if index == 0 {
                DecisionReason::AnchorRequired
            } else {
                DecisionReason::PositionRequired
            };
            return Ok(self.await_decision(index, reason));
        };

        let plane = match self.load(index, source)? {
            Loaded::Plane(plane) => plane,
            Loaded::Handled(outcome) => return Ok(outcome),
        };

        match self.tracker.locate(&plane, anchor, self.config.search_radius) {
            TrackResult::Found {
                position, method, ..
            } => {
                self.set_position(index, Some(position));
                self.advance();
                Ok(StepOutcome::Positioned {
                    frame_index: index,
                    position,
                    method: Some(method),
                })
            }
            TrackResult::Lost { expected } => {
                warn!(frame = index, %expected, "Tracking lost, waiting for a position");
                self.record_failure(
                    index,
                    FailureKind::TrackingLost,
                    format!("star lost near {expected}"),
                );
                Ok(self.await_decision(index, DecisionReason::TrackingLost { expected }))
            }
        }
    }

    fn step_sequential(&mut self, source: &dyn FrameSource) -> Result<StepOutcome> {
        if self.current_frame_index >= self.frame_count {
            return Ok(self.complete_phase());
        }
        let index = self.current_frame_index;
        let Some(position) = self.position(index) else {
            let reason = if index == 0 {
                DecisionReason::AnchorRequired
            } else {
                DecisionReason::PositionRequired
            };
            return Ok(self.await_decision(index, reason));
        };

        let plane = match self.load(index, source)? {
            Loaded::Plane(plane) => plane,
            Loaded::Handled(outcome) => return Ok(outcome),
        };
        let result = self.measure(index, &plane, position, source);
        self.advance();
        Ok(StepOutcome::Measured(result))
    }

    fn step_batch(&mut self, source: &dyn FrameSource) -> Result<StepOutcome> {
        if self.current_frame_index >= self.batch_end {
            return Ok(self.complete_phase());
        }
        let index = self.current_frame_index;
        if index >= self.positions.len() {
            return self.retrack_batch_frame(index, source);
        }
        let Some(position) = self.position(index) else {
            debug!(frame = index, "No position, frame skipped");
            self.advance();
            return Ok(StepOutcome::Skipped { frame_index: index });
        };

        let plane = match self.load(index, source)? {
            Loaded::Plane(plane) => plane,
            Loaded::Handled(outcome) => return Ok(outcome),
        };
        let result = self.measure(index, &plane, position, source);
        self.advance();
        Ok(StepOutcome::Measured(result))
    }

    /// Track and measure a batch frame whose position was discarded by an
    /// overwrite.
    fn retrack_batch_frame(
        &mut self,
        index: usize,
        source: &dyn FrameSource,
    ) -> Result<StepOutcome> {
        let anchor = if self.config.auto_tracking {
            self.last_known_before(index)
        } else {
            None
        };
        let Some(anchor) = anchor else {
            return Ok(self.await_decision(index, DecisionReason::PositionRequired));
        };

        let plane = match self.load(index, source)? {
            Loaded::Plane(plane) => plane,
            Loaded::Handled(outcome) => return Ok(outcome),
        };
        match self.tracker.locate(&plane, anchor, self.config.search_radius) {
            TrackResult::Found { position, .. } => {
                self.set_position(index, Some(position));
                let result = self.measure(index, &plane, position, source);
                self.advance();
                Ok(StepOutcome::Measured(result))
            }
            TrackResult::Lost { expected } => {
                warn!(frame = index, %expected, "Tracking lost on re-track, waiting for a position");
                self.record_failure(
                    index,
                    FailureKind::TrackingLost,
                    format!("star lost near {expected}"),
                );
                Ok(self.await_decision(index, DecisionReason::TrackingLost { expected }))
            }
        }
    }

    /// Answer the pending decision.
    ///
    /// A supplied position is refined by the tracker when auto-tracking is
    /// on; the refined position is used if tracking succeeds, the supplied
    /// one otherwise.
    pub fn resolve(
        &mut self,
        resolution: Resolution,
        source: &dyn FrameSource,
    ) -> Result<StepOutcome> {
        self.ensure_not_frozen()?;
        let pending = self.pending.ok_or(StarphotError::NoPendingDecision)?;
        if !self.mode.is_active() {
            return Err(self.invalid_state("resolve a decision"));
        }
        let index = pending.frame_index;

        match resolution {
            Resolution::Position(supplied) => {
                if pending.reason == DecisionReason::FrameDecodeFailed {
                    return Err(self.invalid_state("position an undecodable frame"));
                }
                self.pending = None;

                let needs_plane =
                    self.config.auto_tracking || self.mode != SessionMode::PreSelecting;
                let plane = if needs_plane {
                    match self.load(index, source)? {
                        Loaded::Plane(plane) => Some(plane),
                        Loaded::Handled(outcome) => return Ok(outcome),
                    }
                } else {
                    None
                };

                let position = match &plane {
                    Some(plane) => self.refine(plane, supplied),
                    None => supplied,
                };
                self.failures
                    .retain(|f| !(f.frame_index == index && f.kind == FailureKind::TrackingLost));
                self.set_position(index, Some(position));
                debug!(frame = index, %supplied, %position, "Decision resolved with a position");

                let measures = matches!(
                    self.mode,
                    SessionMode::SequentialManual | SessionMode::BatchAutomatic
                );
                if let (true, Some(plane)) = (measures, &plane) {
                    let result = self.measure(index, plane, position, source);
                    self.advance();
                    return Ok(StepOutcome::Measured(result));
                }
                self.advance();
                Ok(StepOutcome::Positioned {
                    frame_index: index,
                    position,
                    method: None,
                })
            }
            Resolution::Skip => {
                if index == 0 {
                    return Err(StarphotError::AnchorMissing);
                }
                self.pending = None;
                if self.mode != SessionMode::BatchAutomatic || index >= self.positions.len() {
                    self.set_position(index, None);
                }
                info!(frame = index, "Frame skipped");
                self.advance();
                Ok(StepOutcome::Skipped { frame_index: index })
            }
            Resolution::Retry => {
                if pending.reason != DecisionReason::FrameDecodeFailed {
                    return Err(self.invalid_state("retry a decoded frame"));
                }
                self.pending = None;
                self.failures.retain(|f| {
                    !(f.frame_index == index && f.kind == FailureKind::FrameDecodeFailed)
                });
                self.step(source)
            }
            Resolution::Stop => {
                self.pending = None;
                self.pause_at_boundary();
                Ok(StepOutcome::Interrupted { frame_index: index })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers

    fn ensure_not_frozen(&self) -> Result<()> {
        if self.frozen {
            Err(StarphotError::SessionFrozen)
        } else {
            Ok(())
        }
    }

    fn invalid_state(&self, operation: &'static str) -> StarphotError {
        StarphotError::InvalidState {
            operation,
            mode: self.mode.to_string(),
        }
    }

    fn advance(&mut self) {
        self.current_frame_index += 1;
        self.view_index = self.current_frame_index.min(self.frame_count - 1);
    }

    fn complete_phase(&mut self) -> StepOutcome {
        info!(
            mode = %self.mode,
            positioned = self.positions.iter().flatten().count(),
            measured = self.results.len(),
            failures = self.failures.len(),
            "Phase complete"
        );
        self.mode = SessionMode::Idle;
        self.paused_from = None;
        self.completed = true;
        StepOutcome::Complete
    }

    fn await_decision(&mut self, frame_index: usize, reason: DecisionReason) -> StepOutcome {
        let decision = PendingDecision {
            frame_index,
            reason,
        };
        debug!(frame = frame_index, %reason, "Waiting for a decision");
        self.pending = Some(decision);
        StepOutcome::AwaitingDecision(decision)
    }

    fn set_position(&mut self, index: usize, position: Option<Position>) {
        if self.positions.len() <= index {
            self.positions.resize(index + 1, None);
        }
        self.positions[index] = position;
    }

    fn last_known_before(&self, index: usize) -> Option<Position> {
        let end = index.min(self.positions.len());
        self.positions[..end].iter().rev().flatten().next().copied()
    }

    fn record_failure(&mut self, frame_index: usize, kind: FailureKind, message: String) {
        self.failures
            .retain(|f| !(f.frame_index == frame_index && f.kind == kind));
        let at = self.failures.partition_point(|f| f.frame_index <= frame_index);
        self.failures.insert(
            at,
            FrameFailure {
                frame_index,
                kind,
                message,
            },
        );
    }

    fn refine(&mut self, plane: &PixelPlane, supplied: Position) -> Position {
        refine_with(&mut self.tracker, &self.config, plane, supplied)
    }

    /// Decode a frame, applying the failure policy on error. A decode
    /// failure of the first frame is fatal.
    fn load(&mut self, index: usize, source: &dyn FrameSource) -> Result<Loaded> {
        let error = match source.load(index) {
            Ok(plane) => return Ok(Loaded::Plane(plane)),
            Err(e @ StarphotError::FrameIndexOutOfRange { .. }) => return Err(e),
            Err(e) if index == 0 => return Err(e),
            Err(e) => e,
        };

        warn!(frame = index, error = %error, "Frame could not be decoded");
        self.record_failure(index, FailureKind::FrameDecodeFailed, error.to_string());
        match self.config.decode_failure {
            FailurePolicy::Skip => {
                if self.mode == SessionMode::PreSelecting {
                    self.set_position(index, None);
                }
                self.advance();
                Ok(Loaded::Handled(StepOutcome::Skipped { frame_index: index }))
            }
            FailurePolicy::Ask => Ok(Loaded::Handled(
                self.await_decision(index, DecisionReason::FrameDecodeFailed),
            )),
        }
    }

    fn measure(
        &mut self,
        index: usize,
        plane: &PixelPlane,
        position: Position,
        source: &dyn FrameSource,
    ) -> PhotometryResult {
        let movement = self
            .last_known_before(index)
            .map_or(0.0, |previous| previous.distance(&position));
        let result = PhotometryResult {
            frame_index: index,
            label: source.label(index),
            position,
            movement,
            aperture: *self.photometer.params(),
            is_rgb: plane.is_rgb(),
            channels: self.photometer.measure(plane, position),
        };
        debug!(frame = index, %position, movement, "Frame measured");

        self.results.retain(|r| r.frame_index < index);
        self.results.push(result.clone());
        result
    }
}

/// Track from a supplied position; keep it if the star is not found.
fn refine_with(
    tracker: &mut CentroidTracker,
    config: &SessionConfig,
    plane: &PixelPlane,
    supplied: Position,
) -> Position {
    if !config.auto_tracking {
        return supplied;
    }
    match tracker.locate(plane, supplied, config.search_radius) {
        TrackResult::Found { position, .. } => position,
        TrackResult::Lost { .. } => supplied,
    }
}
