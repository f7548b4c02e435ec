//! Drishti - Traffic-light stop-waypoint detector
//!
//! Given the vehicle pose, the planned route, a static stop-line map and the
//! tracked traffic lights, Drishti decides on every camera frame which route
//! waypoint the vehicle must stop at (or that no stop is required).
//!
//! ## Stages
//!
//! - [`detection::Path`]: nearest route waypoint to a point
//! - [`detection::StopLineAssociator`] / [`detection::LightAssociator`]: stop line
//!   near the vehicle, light nearest that stop line
//! - [`detection::CameraProjector`]: light position to pixels and a search region
//! - [`classifier`]: light state from the image (or the simulator hint)
//! - [`detection::StateDebouncer`]: commit to a state only after N identical frames
//!
//! [`pipeline::Pipeline`] runs one pass over a [`pipeline::Scene`];
//! [`node`] puts it behind a channel on its own thread.

pub mod classifier;
pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod node;
pub mod pipeline;
pub mod replay;

// Re-export commonly used types
pub use config::DrishtiConfig;
pub use core::{LightState, Pose, StopWaypoint, TrackedLight};
pub use error::{Error, Result};
pub use node::{DetectorNode, Input, NodeHandle, NodeStatus};
pub use pipeline::{PassOutcome, Pipeline, Scene};
