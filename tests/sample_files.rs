//! Shipped configuration and replay files stay loadable
//!
//! Run with: `cargo test --test sample_files`

use std::path::PathBuf;

use drishti::classifier::create_classifier;
use drishti::node::{self, DetectorNode};
use drishti::replay::Replay;
use drishti::{DrishtiConfig, StopWaypoint};

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

#[test]
fn test_reference_config_matches_defaults() {
    let loaded = DrishtiConfig::load(scenario("drishti.toml")).unwrap();
    let defaults = DrishtiConfig::default();
    assert_eq!(loaded.stop_lines(), defaults.stop_lines());
    assert_eq!(loaded.association.light_radius, None);
    assert_eq!(loaded.camera.focal_length, defaults.camera.focal_length);
    assert_eq!(loaded.debounce.threshold, defaults.debounce.threshold);
    assert_eq!(loaded.classifier.kind, defaults.classifier.kind);
}

#[test]
fn test_sample_replay_lock_step() {
    let config = DrishtiConfig::load(scenario("straight.toml")).unwrap();
    let replay = Replay::load(scenario("red_then_green.jsonl")).unwrap();
    assert_eq!(replay.frame_count(), 6);

    let mut detector = DetectorNode::new(&config, create_classifier(&config.classifier));
    let outputs: Vec<i32> = replay
        .records()
        .iter()
        .filter_map(|r| detector.handle(replay.to_input(r).unwrap()))
        .filter_map(|outcome| outcome.waypoint())
        .map(|w| w.to_wire())
        .collect();
    assert_eq!(outputs, vec![-1, -1, 2, 2, 2, -1]);
}

#[test]
fn test_sample_replay_on_detector_thread() {
    let config = DrishtiConfig::load(scenario("straight.toml")).unwrap();
    let replay = Replay::load(scenario("red_then_green.jsonl")).unwrap();
    let handle = node::spawn(&config, create_classifier(&config.classifier)).unwrap();

    for record in replay.records() {
        handle.send(replay.to_input(record).unwrap()).unwrap();
    }
    let (status, published) = handle.shutdown().unwrap();

    // Same sequence as lock-step: one output per frame, none merged
    let wire: Vec<i32> = published.iter().map(|w| w.to_wire()).collect();
    assert_eq!(wire, vec![-1, -1, 2, 2, 2, -1]);
    assert_eq!(status.frames_received, 6);
    assert_eq!(status.passes, 6);
    assert_eq!(status.last_output, Some(StopWaypoint::NONE));
}
