mod common;

use std::time::Duration;

use common::drifting_sequence;
use starphot_core::error::StarphotError;
use starphot_core::frame::Position;
use starphot_core::session::{
    DecisionReason, FailurePolicy, Resolution, SessionConfig, SessionMode, WorkflowSession,
};
use starphot_core::source::InMemorySource;
use starphot_core::worker::{spawn_batch_worker, BatchHandle, WorkerEvent};

fn batch_session(n: usize, policy: FailurePolicy) -> (WorkflowSession, Vec<Position>) {
    let (_, truth) = drifting_sequence(n, Position::new(30.0, 30.0), 1.0, 0.5);
    let config = SessionConfig {
        star_name: "altair".into(),
        decode_failure: policy,
        ..SessionConfig::default()
    };
    let positions = truth.iter().copied().map(Some).collect();
    let mut session = WorkflowSession::from_positions(config, n, positions).unwrap();
    session.start_batch().unwrap();
    (session, truth)
}

/// Drain events until the session comes back, answering decisions with
/// `resolution`.
fn drain(handle: &BatchHandle, resolution: Resolution) -> (Vec<WorkerEvent>, WorkflowSession) {
    let mut events = Vec::new();
    loop {
        let event = handle
            .events
            .recv_timeout(Duration::from_secs(10))
            .expect("worker stalled");
        match event {
            WorkerEvent::Finished(session) => return (events, *session),
            WorkerEvent::DecisionRequired(_) => {
                handle.resolve(resolution).unwrap();
                events.push(event);
            }
            other => events.push(other),
        }
    }
}

// ---------------------------------------------------------------------------
// spawn_batch_worker
// ---------------------------------------------------------------------------

#[test]
fn test_worker_measures_all_frames() {
    let (frames, _) = drifting_sequence(4, Position::new(30.0, 30.0), 1.0, 0.5);
    let (session, _) = batch_session(4, FailurePolicy::Skip);
    let handle = spawn_batch_worker(session, Box::new(InMemorySource::new(frames))).unwrap();

    let (events, session) = drain(&handle, Resolution::Skip);
    handle.join().unwrap();

    let measured: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Result(r) => Some(r.frame_index),
            _ => None,
        })
        .collect();
    assert_eq!(measured, vec![0, 1, 2, 3]);
    assert!(events.iter().any(|e| matches!(
        e,
        WorkerEvent::Progress {
            items_total: Some(4),
            ..
        }
    )));
    assert!(session.is_complete());
    assert_eq!(session.mode(), SessionMode::Idle);
    assert_eq!(session.results().len(), 4);
}

#[test]
fn test_worker_reports_skipped_failures() {
    let (frames, _) = drifting_sequence(3, Position::new(30.0, 30.0), 1.0, 0.5);
    let mut frames: Vec<_> = frames.into_iter().map(Some).collect();
    frames[2] = None;
    let (session, _) = batch_session(3, FailurePolicy::Skip);
    let handle =
        spawn_batch_worker(session, Box::new(InMemorySource::with_failures(frames))).unwrap();

    let (events, session) = drain(&handle, Resolution::Skip);
    handle.join().unwrap();

    let failures: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::Failure(f) => Some(f.frame_index),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![2]);
    assert_eq!(session.results().len(), 2);
}

#[test]
fn test_worker_waits_for_decision() {
    let (frames, _) = drifting_sequence(3, Position::new(30.0, 30.0), 1.0, 0.5);
    let mut frames: Vec<_> = frames.into_iter().map(Some).collect();
    frames[1] = None;
    let (session, _) = batch_session(3, FailurePolicy::Ask);
    let handle =
        spawn_batch_worker(session, Box::new(InMemorySource::with_failures(frames))).unwrap();

    let (events, session) = drain(&handle, Resolution::Skip);
    handle.join().unwrap();

    let decisions: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkerEvent::DecisionRequired(d) => Some(*d),
            _ => None,
        })
        .collect();
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].frame_index, 1);
    assert_eq!(decisions[0].reason, DecisionReason::FrameDecodeFailed);
    assert!(session.is_complete());
    assert_eq!(session.results().len(), 2);
}

#[test]
fn test_worker_stop_leaves_session_paused() {
    let (frames, _) = drifting_sequence(3, Position::new(30.0, 30.0), 1.0, 0.5);
    let (session, _) = batch_session(3, FailurePolicy::Skip);
    session.controls().request_stop();
    let handle = spawn_batch_worker(session, Box::new(InMemorySource::new(frames))).unwrap();

    let (events, session) = drain(&handle, Resolution::Skip);
    handle.join().unwrap();

    assert!(events
        .iter()
        .any(|e| matches!(e, WorkerEvent::Interrupted { frame_index: 0 })));
    assert_eq!(session.mode(), SessionMode::Paused);
    assert!(session.results().is_empty());
    assert!(!session.is_complete());
}

#[test]
fn test_worker_needs_active_session() {
    let config = SessionConfig::default();
    let session = WorkflowSession::new(config, 2).unwrap();
    let result = spawn_batch_worker(session, Box::new(InMemorySource::default()));
    assert!(matches!(result, Err(StarphotError::InvalidState { .. })));
}
