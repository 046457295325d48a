mod common;

use common::{assert_near, drifting_sequence, flat_frame, rgb_star_frame, star_frame};
use starphot_core::frame::Position;
use starphot_core::track::{
    CentroidTracker, MethodKind, TrackResult, TrackerConfig, TrackingHistory, TrackingStrategy,
};

fn consensus_tracker() -> CentroidTracker {
    CentroidTracker::new(TrackerConfig {
        strategy: TrackingStrategy::Consensus,
        ..TrackerConfig::default()
    })
}

// ---------------------------------------------------------------------------
// TrackingHistory
// ---------------------------------------------------------------------------

#[test]
fn test_history_evicts_oldest_first() {
    let mut history = TrackingHistory::new(5);
    for i in 0..12 {
        history.push(Position::new(i as f64, 0.0), 0.8);
    }
    assert_eq!(history.len(), 5);
    assert_eq!(history.velocities().count(), 5);
    let xs: Vec<f64> = history.entries().map(|e| e.position.x).collect();
    assert_eq!(xs, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
}

#[test]
fn test_history_clamps_confidence() {
    let mut history = TrackingHistory::new(5);
    history.push(Position::new(1.0, 1.0), 1.7);
    history.push(Position::new(1.0, 1.0), -0.2);
    let confidences: Vec<f64> = history.entries().map(|e| e.confidence).collect();
    assert_eq!(confidences, vec![1.0, 0.0]);
}

#[test]
fn test_predict_needs_two_positions() {
    let mut history = TrackingHistory::new(5);
    let expected = Position::new(10.0, 10.0);
    assert_eq!(history.predict(expected), expected);
    history.push(Position::new(3.0, 3.0), 0.8);
    assert_eq!(history.predict(expected), expected);
}

#[test]
fn test_predict_weights_recent_velocity_more() {
    let mut history = TrackingHistory::new(5);
    history.push(Position::new(0.0, 0.0), 0.8);
    history.push(Position::new(1.0, 0.0), 0.8);
    history.push(Position::new(3.0, 0.0), 0.8);
    // velocities (1, 0) and (2, 0) with weights 1/2 and 1
    let predicted = history.predict(Position::new(3.0, 0.0));
    assert!((predicted.x - (3.0 + 2.5 / 1.5)).abs() < 1e-9);
    assert!(predicted.y.abs() < 1e-9);
}

#[test]
fn test_adaptive_radius_grows_with_scatter() {
    let mut history = TrackingHistory::new(5);
    for (x, y) in [(-3.0, -4.0), (3.0, 4.0), (-3.0, -4.0), (3.0, 4.0)] {
        history.push(Position::new(x, y), 0.8);
    }
    // std_x = 3, std_y = 4, scatter 5
    assert!((history.adaptive_radius(25.0) - 35.0).abs() < 1e-9);
}

#[test]
fn test_adaptive_radius_bounds() {
    let mut history = TrackingHistory::new(5);
    history.push(Position::new(0.0, 0.0), 0.8);
    history.push(Position::new(100.0, 0.0), 0.8);
    assert_eq!(history.adaptive_radius(25.0), 25.0);

    history.push(Position::new(0.0, 100.0), 0.8);
    assert_eq!(history.adaptive_radius(25.0), 50.0);

    let mut still = TrackingHistory::new(5);
    for _ in 0..4 {
        still.push(Position::new(5.0, 5.0), 0.8);
    }
    assert_eq!(still.adaptive_radius(25.0), 25.0);
}

// ---------------------------------------------------------------------------
// CentroidTracker
// ---------------------------------------------------------------------------

#[test]
fn test_finds_star_from_offset_guess() {
    let truth = Position::new(40.3, 38.7);
    let mut tracker = CentroidTracker::default();
    let result = tracker.locate(&star_frame(truth), Position::new(44.0, 35.0), 25.0);

    match result {
        TrackResult::Found {
            position,
            confidence,
            method,
        } => {
            assert_near(position, truth, 0.1);
            assert_eq!(method, MethodKind::CenterOfMass);
            assert!((confidence - 0.8).abs() < 1e-9);
        }
        TrackResult::Lost { .. } => panic!("star not found"),
    }
}

#[test]
fn test_constant_plane_is_lost() {
    let mut tracker = CentroidTracker::default();
    let expected = Position::new(40.0, 40.0);
    let result = tracker.locate(&flat_frame(), expected, 25.0);

    assert_eq!(result, TrackResult::Lost { expected });
    assert!(result.confidence() <= 0.1);
    assert_eq!(result.position(), expected);
    assert_eq!(tracker.history().len(), 1);
}

#[test]
fn test_history_records_every_attempt() {
    let mut tracker = CentroidTracker::default();
    let (frames, _) = drifting_sequence(3, Position::new(30.0, 30.0), 1.0, 0.5);
    for frame in &frames {
        tracker.locate(frame, Position::new(30.0, 30.0), 25.0);
    }
    tracker.locate(&flat_frame(), Position::new(30.0, 30.0), 25.0);
    assert_eq!(tracker.history().len(), 4);

    tracker.reset();
    assert!(tracker.history().is_empty());
}

#[test]
fn test_follows_drifting_star() {
    let (frames, truth) = drifting_sequence(8, Position::new(25.0, 30.0), 2.0, 1.5);
    let mut tracker = CentroidTracker::default();
    let mut expected = truth[0];
    for (frame, &true_pos) in frames.iter().zip(&truth) {
        let result = tracker.locate(frame, expected, 15.0);
        assert!(result.is_found());
        assert_near(result.position(), true_pos, 0.1);
        expected = result.position();
    }
}

#[test]
fn test_momentum_bridges_missing_star() {
    let mut tracker = CentroidTracker::default();
    let first = tracker.locate(&star_frame(Position::new(30.0, 30.0)), Position::new(30.0, 30.0), 25.0);
    let second = tracker.locate(&star_frame(Position::new(32.0, 31.0)), first.position(), 25.0);
    assert!(second.is_found());

    let bridged = tracker.locate(&flat_frame(), second.position(), 25.0);
    match bridged {
        TrackResult::Found {
            position,
            confidence,
            method,
        } => {
            assert_eq!(method, MethodKind::Momentum);
            assert!((confidence - 0.3).abs() < 1e-9);
            assert_near(position, Position::new(34.0, 32.0), 0.2);
        }
        TrackResult::Lost { .. } => panic!("momentum should bridge one empty frame"),
    }
}

#[test]
fn test_star_at_edge_is_rejected() {
    let truth = Position::new(3.0, 40.0);
    let mut tracker = CentroidTracker::default();
    let result = tracker.locate(&star_frame(truth), truth, 25.0);
    assert!(!result.is_found());
}

#[test]
fn test_guess_outside_plane_is_lost() {
    let mut tracker = CentroidTracker::default();
    let expected = Position::new(500.0, 500.0);
    let result = tracker.locate(&star_frame(Position::new(40.0, 40.0)), expected, 25.0);
    assert_eq!(result, TrackResult::Lost { expected });
}

#[test]
fn test_consensus_finds_star() {
    let truth = Position::new(41.6, 37.2);
    let mut tracker = consensus_tracker();
    let result = tracker.locate(&star_frame(truth), Position::new(38.0, 40.0), 25.0);

    assert!(result.is_found());
    assert_near(result.position(), truth, 0.3);
    assert!(result.confidence() > 0.0 && result.confidence() <= 1.0);
}

#[test]
fn test_consensus_on_constant_plane_is_lost() {
    let mut tracker = consensus_tracker();
    let result = tracker.locate(&flat_frame(), Position::new(40.0, 40.0), 25.0);
    assert!(!result.is_found());
}

#[test]
fn test_rgb_tracks_on_luminance() {
    let truth = Position::new(36.4, 44.1);
    let mut tracker = CentroidTracker::default();
    let result = tracker.locate(&rgb_star_frame(truth), Position::new(39.0, 42.0), 25.0);
    assert_near(result.position(), truth, 0.1);
}

#[test]
fn test_strategy_display() {
    assert_eq!(format!("{}", TrackingStrategy::Sequential), "Sequential");
    assert_eq!(format!("{}", TrackingStrategy::Consensus), "Consensus");
    assert_eq!(TrackingStrategy::default(), TrackingStrategy::Sequential);
}

#[test]
fn test_method_display() {
    assert_eq!(format!("{}", MethodKind::CenterOfMass), "Center of Mass");
    assert_eq!(format!("{}", MethodKind::Momentum), "Momentum");
}
