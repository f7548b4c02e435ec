//! End-to-end detector scenarios
//!
//! Drives the full detector (association, projection, classification,
//! debouncing) through short synthetic drives and checks the published
//! waypoint sequence.
//!
//! Run with: `cargo test --test scenario`

use approx::assert_relative_eq;
use drishti::classifier::{ClassifierKind, GroundTruthClassifier, create_classifier};
use drishti::core::{ImageFrame, LightState, Point3, Pose, Quaternion, TrackedLight, Vec3};
use drishti::detection::{CameraProjector, Path};
use drishti::node::{DetectorNode, Input};
use drishti::pipeline::{MissPolicy, PassOutcome};
use drishti::replay::Replay;
use drishti::{DrishtiConfig, StopWaypoint};
use image::{Rgb, RgbImage};
use std::f64::consts::FRAC_PI_2;

// ============================================================================
// Fixtures
// ============================================================================

/// Single stop line at (19, 0) on a straight eastbound route
fn straight_config() -> DrishtiConfig {
    let mut config = DrishtiConfig::default();
    config.stop_line.positions = vec![[19.0, 0.0]];
    config
}

fn straight_route() -> Path {
    Path::from_positions([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(20.0, 0.0, 0.0),
    ])
}

fn light_at(x: f64, y: f64, z: f64, state: LightState) -> Input {
    Input::Lights(vec![TrackedLight::new(Point3::new(x, y, z), state)])
}

fn frame(stamp_us: u64) -> Input {
    Input::Image(ImageFrame::blank(stamp_us, 800, 600))
}

/// Published wire value for an image input, `None` when no result.
fn wire(node: &mut DetectorNode, input: Input) -> Option<i32> {
    node.handle(input)
        .and_then(|outcome| outcome.waypoint())
        .map(|w| w.to_wire())
}

fn ready_node(config: &DrishtiConfig) -> DetectorNode {
    let mut node = DetectorNode::new(config, create_classifier(&config.classifier));
    node.handle(Input::Pose(Pose::at(Vec3::ZERO)));
    node.handle(Input::Path(straight_route()));
    node
}

// ============================================================================
// Debounced output
// ============================================================================

#[test]
fn test_red_latches_then_green_releases() {
    let config = straight_config();
    let mut node = ready_node(&config);

    node.handle(light_at(19.0, 1.0, 0.0, LightState::Red));
    let red: Vec<_> = (0..3).map(|t| wire(&mut node, frame(t))).collect();
    assert_eq!(red, vec![Some(-1), Some(-1), Some(2)]);

    node.handle(light_at(19.0, 1.0, 0.0, LightState::Green));
    let green: Vec<_> = (3..6).map(|t| wire(&mut node, frame(t))).collect();
    assert_eq!(green, vec![Some(2), Some(2), Some(-1)]);
}

#[test]
fn test_interrupted_red_does_not_latch() {
    let config = straight_config();
    let mut node = ready_node(&config);

    let mut outputs = Vec::new();
    for state in [
        LightState::Red,
        LightState::Red,
        LightState::Green,
        LightState::Red,
        LightState::Red,
    ] {
        node.handle(light_at(19.0, 1.0, 0.0, state));
        outputs.push(wire(&mut node, frame(0)));
    }
    assert!(outputs.iter().all(|o| *o == Some(-1)));
}

#[test]
fn test_yellow_stops_only_when_configured() {
    let mut config = straight_config();
    let mut node = ready_node(&config);
    node.handle(light_at(19.0, 1.0, 0.0, LightState::Yellow));
    for t in 0..4 {
        assert_eq!(wire(&mut node, frame(t)), Some(-1));
    }

    config.debounce.stop_on_yellow = true;
    let mut node = ready_node(&config);
    node.handle(light_at(19.0, 1.0, 0.0, LightState::Yellow));
    let outputs: Vec<_> = (0..3).map(|t| wire(&mut node, frame(t))).collect();
    assert_eq!(outputs, vec![Some(-1), Some(-1), Some(2)]);
}

#[test]
fn test_missing_path_gives_no_result() {
    let config = straight_config();
    let mut node = DetectorNode::new(&config, Box::new(GroundTruthClassifier));
    node.handle(Input::Pose(Pose::at(Vec3::ZERO)));
    node.handle(light_at(19.0, 1.0, 0.0, LightState::Red));

    for t in 0..5 {
        assert!(matches!(node.handle(frame(t)), Some(PassOutcome::NoResult(_))));
    }
    // No debouncer side effects
    assert_eq!(node.debouncer().state().count, 0);
    assert_eq!(node.debouncer().latched(), StopWaypoint::NONE);
}

#[test]
fn test_identical_inputs_give_identical_outputs() {
    let config = straight_config();
    let drive = |node: &mut DetectorNode| -> Vec<Option<i32>> {
        let states = [
            LightState::Red,
            LightState::Red,
            LightState::Red,
            LightState::Unknown,
            LightState::Green,
        ];
        states
            .iter()
            .enumerate()
            .map(|(t, &state)| {
                node.handle(light_at(19.0, 1.0, 0.0, state));
                wire(node, frame(t as u64))
            })
            .collect()
    };
    let a = drive(&mut ready_node(&config));
    let b = drive(&mut ready_node(&config));
    assert_eq!(a, b);
}

// ============================================================================
// Association policies
// ============================================================================

#[test]
fn test_stop_line_behind_vehicle_needs_ahead_check() {
    let mut config = straight_config();
    config.stop_line.positions = vec![[1.0, 0.0]];

    let drive = |config: &DrishtiConfig| {
        let mut node = DetectorNode::new(config, Box::new(GroundTruthClassifier));
        node.handle(Input::Pose(Pose::at(Vec3::new(10.0, 0.0, 0.0))));
        node.handle(Input::Path(straight_route()));
        node.handle(light_at(1.0, 1.0, 0.0, LightState::Red));
        (0..3).map(|t| wire(&mut node, frame(t))).last().flatten()
    };

    // Without the check the line behind still latches
    assert_eq!(drive(&config), Some(0));

    config.association.require_ahead = true;
    assert_eq!(drive(&config), Some(-1));
}

#[test]
fn test_light_radius_bounds_association() {
    let mut config = straight_config();
    config.association.light_radius = Some(5.0);
    let mut node = ready_node(&config);
    node.handle(light_at(60.0, 30.0, 0.0, LightState::Red));

    let outputs: Vec<_> = (0..3).map(|t| wire(&mut node, frame(t))).collect();
    assert_eq!(outputs, vec![Some(-1); 3]);
}

#[test]
fn test_hold_policy_survives_lost_lights() {
    let mut config = straight_config();
    config.pipeline.miss_policy = MissPolicy::Hold;
    let mut node = ready_node(&config);
    node.handle(light_at(19.0, 1.0, 0.0, LightState::Red));
    for t in 0..3 {
        wire(&mut node, frame(t));
    }

    node.handle(Input::Lights(Vec::new()));
    for t in 3..10 {
        assert_eq!(wire(&mut node, frame(t)), Some(2));
    }
}

// ============================================================================
// Camera path
// ============================================================================

#[test]
fn test_rotated_vehicle_projection() {
    let config = straight_config();
    let projector = CameraProjector::new(config.camera.without_mount_correction());
    let north = Pose::new(Vec3::ZERO, Quaternion::from_yaw(FRAC_PI_2));

    let ahead = projector.project(&north, &Point3::new(0.0, 40.0, 0.0)).unwrap();
    let screen = ahead.screen.expect("visible");
    assert_relative_eq!(screen.x, 400.0, epsilon = 1e-6);
    assert_relative_eq!(screen.y, 300.0, epsilon = 1e-6);
    assert_relative_eq!(screen.scale, 1.0 / 40.0, epsilon = 1e-9);

    let east = projector.project(&north, &Point3::new(40.0, 0.0, 0.0)).unwrap();
    assert!(!east.is_visible());
}

/// Draw a lit lamp at the light's projected pixel and let the color
/// classifier find it without any ground-truth state.
#[test]
fn test_color_classifier_reads_rendered_lamp() {
    let mut config = straight_config();
    config.stop_line.positions = vec![[38.0, 0.0]];
    config.camera = config.camera.without_mount_correction();
    config.classifier.kind = ClassifierKind::Color;
    config.pipeline.ground_truth_hint = false;

    let light = Point3::new(40.0, 0.0, 1.0);
    let projector = CameraProjector::new(config.camera.clone());
    let screen = projector
        .project(&Pose::at(Vec3::ZERO), &light)
        .unwrap()
        .screen
        .expect("light in view");

    let mut image = RgbImage::from_pixel(800, 600, Rgb([30, 30, 35]));
    let (cx, cy) = (screen.x.round() as u32, screen.y.round() as u32);
    for y in cy - 8..cy + 8 {
        for x in cx - 8..cx + 8 {
            image.put_pixel(x, y, Rgb([255, 40, 30]));
        }
    }

    let mut node = DetectorNode::new(&config, create_classifier(&config.classifier));
    node.handle(Input::Pose(Pose::at(Vec3::ZERO)));
    node.handle(Input::Path(Path::from_positions([
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(20.0, 0.0, 0.0),
        Point3::new(40.0, 0.0, 0.0),
    ])));
    node.handle(Input::Lights(vec![TrackedLight::new(
        light,
        LightState::Unknown,
    )]));

    let outputs: Vec<_> = (0..3)
        .map(|t| wire(&mut node, Input::Image(ImageFrame::new(t, image.clone()))))
        .collect();
    assert_eq!(outputs, vec![Some(-1), Some(-1), Some(2)]);
    assert_eq!(
        node.status().lock().last_observation,
        Some(LightState::Red)
    );
}

// ============================================================================
// Replay
// ============================================================================

#[test]
fn test_replay_drive() {
    let text = r#"
{"type":"pose","t_us":0,"position":{"x":0,"y":0,"z":0}}
{"type":"path","points":[[0,0,0],[10,0,0],[20,0,0]]}
{"type":"lights","lights":[{"position":{"x":19,"y":1,"z":0},"state":"RED"}]}
{"type":"image","stamp_us":1,"width":8,"height":6}
{"type":"image","stamp_us":2,"width":8,"height":6}
{"type":"image","stamp_us":3,"width":8,"height":6}
{"type":"lights","lights":[{"position":{"x":19,"y":1,"z":0},"state":"GREEN"}]}
{"type":"image","stamp_us":4,"width":8,"height":6}
{"type":"image","stamp_us":5,"width":8,"height":6}
{"type":"image","stamp_us":6,"width":8,"height":6}
"#;
    let replay = Replay::parse(text, ".").unwrap();
    let config = straight_config();
    let mut node = DetectorNode::new(&config, create_classifier(&config.classifier));

    let mut outputs = Vec::new();
    for record in replay.records() {
        let input = replay.to_input(record).unwrap();
        if let Some(w) = wire(&mut node, input) {
            outputs.push(w);
        }
    }
    assert_eq!(outputs, vec![-1, -1, 2, 2, 2, -1]);
}
