//! Dedicated thread for long session runs.
//!
//! The session moves onto the worker thread and is only touched there. The
//! caller sees progress through [`WorkerEvent`]s, answers decisions with
//! [`WorkerCommand`]s, and pauses or stops through the shared
//! [`SessionControls`]. The session comes back in [`WorkerEvent::Finished`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::consts::PAUSE_POLL_INTERVAL_MS;
use crate::error::{Result, StarphotError};
use crate::session::{
    FrameFailure, PendingDecision, PhotometryResult, ProgressReporter, Resolution,
    SessionControls, SessionStage, StepOutcome, WorkflowSession,
};
use crate::source::FrameSource;

/// Messages from the worker thread.
#[derive(Debug)]
pub enum WorkerEvent {
    Progress {
        stage: SessionStage,
        items_done: usize,
        items_total: Option<usize>,
    },
    /// A frame was measured.
    Result(PhotometryResult),
    /// A frame failed and was skipped.
    Failure(FrameFailure),
    /// The session waits for a [`WorkerCommand::Resolve`].
    DecisionRequired(PendingDecision),
    /// A stop was requested; the session is paused at `frame_index`.
    Interrupted { frame_index: usize },
    /// Always the last event. Returns the session to the caller.
    Finished(Box<WorkflowSession>),
    Error(String),
}

/// Messages to the worker thread.
#[derive(Debug)]
pub enum WorkerCommand {
    Resolve(Resolution),
    Shutdown,
}

/// Caller's side of a running worker.
pub struct BatchHandle {
    pub events: mpsc::Receiver<WorkerEvent>,
    pub commands: mpsc::Sender<WorkerCommand>,
    pub controls: SessionControls,
    thread: JoinHandle<()>,
}

impl BatchHandle {
    pub fn pause(&self) {
        self.controls.request_pause();
    }

    pub fn resume(&self) {
        self.controls.clear_pause();
    }

    /// Ask the worker to stop before the next frame. Results already
    /// produced are kept.
    pub fn request_stop(&self) {
        self.controls.request_stop();
    }

    pub fn resolve(&self, resolution: Resolution) -> Result<()> {
        self.commands
            .send(WorkerCommand::Resolve(resolution))
            .map_err(|_| StarphotError::Worker("worker has exited".into()))
    }

    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| StarphotError::Worker("worker thread panicked".into()))
    }
}

/// Progress reporter that sends updates over an mpsc channel.
pub struct ChannelProgressReporter {
    tx: mpsc::Sender<WorkerEvent>,
    stage: SessionStage,
    current_total: AtomicUsize,
}

impl ChannelProgressReporter {
    pub fn new(tx: mpsc::Sender<WorkerEvent>, stage: SessionStage) -> Self {
        Self {
            tx,
            stage,
            current_total: AtomicUsize::new(0),
        }
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn begin_stage(&self, stage: SessionStage, total_items: Option<usize>) {
        self.current_total
            .store(total_items.unwrap_or(0), Ordering::Relaxed);
        let _ = self.tx.send(WorkerEvent::Progress {
            stage,
            items_done: 0,
            items_total: total_items,
        });
    }

    fn advance(&self, items_done: usize) {
        let total = self.current_total.load(Ordering::Relaxed);
        let _ = self.tx.send(WorkerEvent::Progress {
            stage: self.stage,
            items_done,
            items_total: if total > 0 { Some(total) } else { None },
        });
    }
}

/// Move an active session onto a named worker thread and run it.
pub fn spawn_batch_worker(
    session: WorkflowSession,
    source: Box<dyn FrameSource>,
) -> Result<BatchHandle> {
    let Some(stage) = session.mode().stage() else {
        return Err(StarphotError::InvalidState {
            operation: "spawn a worker",
            mode: session.mode().to_string(),
        });
    };

    let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
    let controls = session.controls();

    let thread = std::thread::Builder::new()
        .name("starphot-worker".into())
        .spawn(move || {
            let reporter = ChannelProgressReporter::new(event_tx.clone(), stage);
            let session = worker_loop(session, source.as_ref(), &cmd_rx, &event_tx, &reporter);
            let _ = event_tx.send(WorkerEvent::Finished(Box::new(session)));
        })?;

    Ok(BatchHandle {
        events: event_rx,
        commands: cmd_tx,
        controls,
        thread,
    })
}

/// What the loop does after an outcome.
enum Flow {
    Continue,
    Decide(PendingDecision),
    Exit,
}

fn worker_loop(
    mut session: WorkflowSession,
    source: &dyn FrameSource,
    commands: &mpsc::Receiver<WorkerCommand>,
    events: &mpsc::Sender<WorkerEvent>,
    reporter: &ChannelProgressReporter,
) -> WorkflowSession {
    let controls = session.controls();
    let total = session.frame_count();
    if let Some(stage) = session.mode().stage() {
        reporter.begin_stage(stage, Some(total));
    }

    loop {
        match commands.try_recv() {
            Ok(WorkerCommand::Shutdown) => break,
            Ok(WorkerCommand::Resolve(_)) => warn!("Ignoring resolution, no decision pending"),
            Err(_) => {}
        }

        if controls.is_stop_requested() {
            let frame_index = session.current_frame_index();
            if let Err(e) = session.pause() {
                debug!(error = %e, "Session not pausable at stop");
            }
            let _ = events.send(WorkerEvent::Interrupted { frame_index });
            break;
        }
        if controls.is_pause_requested() {
            std::thread::sleep(Duration::from_millis(PAUSE_POLL_INTERVAL_MS));
            continue;
        }

        let mut flow = handle(session.step(source), &session, events, reporter);
        while let Flow::Decide(decision) = flow {
            let _ = events.send(WorkerEvent::DecisionRequired(decision));
            flow = match commands.recv() {
                Ok(WorkerCommand::Resolve(resolution)) => handle(
                    session.resolve(resolution, source),
                    &session,
                    events,
                    reporter,
                ),
                Ok(WorkerCommand::Shutdown) | Err(_) => Flow::Exit,
            };
        }
        if let Flow::Exit = flow {
            break;
        }
    }
    session
}

fn handle(
    outcome: Result<StepOutcome>,
    session: &WorkflowSession,
    events: &mpsc::Sender<WorkerEvent>,
    reporter: &ChannelProgressReporter,
) -> Flow {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = events.send(WorkerEvent::Error(e.to_string()));
            return Flow::Exit;
        }
    };

    match outcome {
        StepOutcome::Measured(result) => {
            let _ = events.send(WorkerEvent::Result(result));
        }
        StepOutcome::Skipped { frame_index } => {
            if let Some(failure) = session
                .failures()
                .iter()
                .find(|f| f.frame_index == frame_index)
            {
                let _ = events.send(WorkerEvent::Failure(failure.clone()));
            }
        }
        StepOutcome::Positioned { .. } => {}
        StepOutcome::AwaitingDecision(decision) => return Flow::Decide(decision),
        StepOutcome::Interrupted { frame_index } => {
            let _ = events.send(WorkerEvent::Interrupted { frame_index });
            return Flow::Exit;
        }
        StepOutcome::Complete => {
            reporter.finish_stage();
            return Flow::Exit;
        }
    }
    reporter.advance(session.current_frame_index().min(session.frame_count()));
    Flow::Continue
}
