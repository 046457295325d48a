use starphot_core::photometry::{ApertureParams, ApertureSampling};
use starphot_core::session::{FailurePolicy, SessionConfig, SessionMode, SessionStage};
use starphot_core::track::{TrackerConfig, TrackingStrategy};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_session_config_defaults() {
    let config = SessionConfig::default();
    assert_eq!(config.aperture, ApertureParams::new(9.0, 12.0, 17.0));
    assert_eq!(config.search_radius, 25.0);
    assert!(config.auto_tracking);
    assert_eq!(config.aperture_sampling, ApertureSampling::Center);
    assert_eq!(config.decode_failure, FailurePolicy::Skip);
    assert_eq!(config.tracker.strategy, TrackingStrategy::Sequential);
    assert_eq!(config.tracker.history_capacity, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_tracker_config_defaults() {
    let tracker = TrackerConfig::default();
    assert_eq!(tracker.edge_margin, 5.0);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn test_toml_roundtrip() {
    let config = SessionConfig {
        star_name: "betelgeuse".into(),
        search_radius: 30.0,
        aperture_sampling: ApertureSampling::Subpixel(4),
        decode_failure: FailurePolicy::Ask,
        tracker: TrackerConfig {
            strategy: TrackingStrategy::Consensus,
            ..TrackerConfig::default()
        },
        ..SessionConfig::default()
    };
    let text = toml::to_string_pretty(&config).unwrap();
    let back: SessionConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let text = r#"
star_name = "deneb"
auto_tracking = false

[aperture]
inner_radius = 6.0
"#;
    let config: SessionConfig = toml::from_str(text).unwrap();
    assert_eq!(config.star_name, "deneb");
    assert!(!config.auto_tracking);
    assert_eq!(config.aperture, ApertureParams::new(6.0, 12.0, 17.0));
    assert_eq!(config.search_radius, 25.0);
    assert_eq!(config.tracker, TrackerConfig::default());
}

#[test]
fn test_json_roundtrip() {
    let config = SessionConfig {
        star_name: "rigel".into(),
        auto_tracking: false,
        ..SessionConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: SessionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_invalid_aperture_fails_validation() {
    let mut config = SessionConfig::default();
    config.aperture.inner_radius = f64::NAN;
    assert!(config.validate().is_err());
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_failure_policy_display() {
    assert_eq!(format!("{}", FailurePolicy::Skip), "Skip");
    assert_eq!(format!("{}", FailurePolicy::Ask), "Ask");
}

#[test]
fn test_session_mode_display() {
    assert_eq!(format!("{}", SessionMode::PreSelecting), "Pre-selecting");
    assert_eq!(format!("{}", SessionMode::BatchAutomatic), "Batch automatic");
    assert!(SessionMode::SequentialManual.is_active());
    assert!(!SessionMode::Paused.is_active());
    assert_eq!(SessionMode::Idle.stage(), None);
}

#[test]
fn test_session_stage_display() {
    assert_eq!(format!("{}", SessionStage::PreSelection), "Pre-selecting positions");
    assert_eq!(format!("{}", SessionStage::Measurement), "Measuring frames");
}
