//! Startup configuration parsing and session control clamping.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use overlens::SessionConfig;

use common::*;

#[test]
fn test_empty_config_uses_defaults() {
    let cfg = AppConfig::from_toml_str("").unwrap();

    assert_eq!(cfg.session.cycle_interval(), Duration::from_millis(16));
    assert_eq!(cfg.session.confidence_threshold(), 0.5);
    assert!(!cfg.session.ai_enabled());
    assert_eq!(cfg.retention, Duration::from_millis(1000));
    assert_eq!(cfg.max_surface_width, 800);
    assert_eq!(cfg.source_retry, Duration::from_millis(2000));
    assert_eq!(cfg.detector_timeout, None);
    assert_eq!(cfg.summary_source, SummarySource::History);
    assert_eq!(cfg.camera, CameraSelection::Environment);
}

#[test]
fn test_config_file_overrides() {
    let cfg = AppConfig::from_toml_str(
        r#"
        history_ms = 1500
        max_surface_width = 640
        export_dir = "/tmp/snapshots"
        detector_timeout_ms = 250
        summary_source = "batch"
        camera = "user"

        [session]
        fps = 30
        confidence_threshold = 0.75
        ai_enabled = true
        "#,
    )
    .unwrap();

    assert_eq!(cfg.retention, Duration::from_millis(1500));
    assert_eq!(cfg.max_surface_width, 640);
    assert_eq!(cfg.export_dir, PathBuf::from("/tmp/snapshots"));
    assert_eq!(cfg.detector_timeout, Some(Duration::from_millis(250)));
    assert_eq!(cfg.summary_source, SummarySource::Batch);
    assert_eq!(cfg.camera, CameraSelection::User);
    assert_eq!(cfg.session.cycle_interval(), Duration::from_nanos(33_333_333));
    assert_eq!(cfg.session.confidence_threshold(), 0.75);
    assert!(cfg.session.ai_enabled());
}

#[test]
fn test_explicit_interval_wins_over_fps() {
    let cfg = AppConfig::from_toml_str(
        r#"
        [session]
        fps = 10
        cycle_interval_ms = 40
        "#,
    )
    .unwrap();
    assert_eq!(cfg.session.cycle_interval(), Duration::from_millis(40));
}

#[test]
fn test_out_of_range_file_values_are_clamped() {
    let cfg = AppConfig::from_toml_str(
        r#"
        [session]
        cycle_interval_ms = 5000
        confidence_threshold = 1.5
        "#,
    )
    .unwrap();
    assert_eq!(cfg.session.cycle_interval(), Duration::from_millis(1000));
    assert_eq!(cfg.session.confidence_threshold(), 1.0);
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(AppConfig::from_toml_str("history_ms = 0").is_err());
    assert!(AppConfig::from_toml_str("max_surface_width = 0").is_err());
    assert!(AppConfig::from_toml_str("summary_source = \"everything\"").is_err());
    assert!(AppConfig::from_toml_str("history_ms = \"soon\"").is_err());
}

#[test]
fn test_zero_timeout_disables_timeout() {
    let cfg = AppConfig::from_toml_str("detector_timeout_ms = 0").unwrap();
    assert_eq!(cfg.detector_timeout, None);
}

#[test]
fn test_device_camera_selection() {
    let cfg = AppConfig::from_toml_str("camera = \"/dev/video2\"").unwrap();
    assert_eq!(cfg.camera, CameraSelection::Device("/dev/video2".to_string()));
    assert_eq!(cfg.camera.to_string(), "/dev/video2");
}

#[test]
fn test_summary_source_parses_from_cli_text() {
    assert_eq!("History".parse::<SummarySource>().unwrap(), SummarySource::History);
    assert_eq!(" batch ".parse::<SummarySource>().unwrap(), SummarySource::Batch);
    assert!("latest".parse::<SummarySource>().is_err());
}

#[test]
fn test_session_setters_clamp() {
    let mut session = SessionConfig::default();

    session.set_cycle_interval(Duration::ZERO);
    assert_eq!(session.cycle_interval(), Duration::from_millis(1));

    session.set_frame_rate(0);
    assert_eq!(session.cycle_interval(), Duration::from_millis(1000));

    session.set_frame_rate(60);
    assert_eq!(session.cycle_interval(), Duration::from_nanos(16_666_666));
    assert!(session.cycle_interval() > Duration::from_millis(16));

    session.set_confidence_threshold(-0.2);
    assert_eq!(session.confidence_threshold(), 0.0);

    session.set_confidence_percent(42);
    assert_eq!(session.confidence_threshold(), 0.42);
}

#[test]
fn test_nan_confidence_keeps_previous_threshold() {
    let mut session = SessionConfig::default();
    session.set_confidence_threshold(0.8);
    session.set_confidence_threshold(f32::NAN);
    assert_eq!(session.confidence_threshold(), 0.8);
}
