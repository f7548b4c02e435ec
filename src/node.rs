//! Detector node: input dispatch and the detection thread.
//!
//! # Threading
//!
//! ```text
//! producers ──Input──▶ [bounded channel] ──▶ detector thread ──StopWaypoint──▶ consumer
//!                                              │ owns Scene + StateDebouncer
//!                                              └─▶ SharedStatus (parking_lot)
//! ```
//!
//! The detector thread applies inputs in arrival order. Pose, path and lights
//! are replaced wholesale (last value wins), and every image runs exactly one
//! pass against the scene as it stood when that image was dequeued. Inputs
//! queued behind a frame never leak into its pass. Nothing else touches the
//! scene, so a pass never sees a half-updated input.
//!
//! The loop exits on [`Input::Shutdown`] or when every sender is dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;

use crate::classifier::LightClassifier;
use crate::config::DrishtiConfig;
use crate::core::{ImageFrame, LightState, Pose, StopWaypoint, TrackedLight};
use crate::detection::{Path, StateDebouncer};
use crate::error::{Error, Result};
use crate::pipeline::{PassOutcome, Pipeline, Scene};

/// One message on a detector input stream.
#[derive(Clone, Debug)]
pub enum Input {
    Pose(Pose),
    /// Replaces the whole route
    Path(Path),
    /// Replaces the whole tracked-light list
    Lights(Vec<TrackedLight>),
    /// Triggers a pass
    Image(ImageFrame),
    Shutdown,
}

/// Node counters, readable from any thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeStatus {
    /// Images received
    pub frames_received: u64,
    /// Passes run (one per image)
    pub passes: u64,
    /// Most inputs seen waiting behind a frame when its pass started
    pub peak_backlog: usize,
    /// Passes that stopped on a missing pose or path
    pub passes_without_result: u64,
    /// Last published waypoint
    pub last_output: Option<StopWaypoint>,
    /// Last raw observation fed to the debouncer
    pub last_observation: Option<LightState>,
}

/// Shared handle to node counters.
pub type SharedStatus = Arc<Mutex<NodeStatus>>;

/// What applying an input did to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Applied {
    Updated,
    Frame,
    Shutdown,
}

/// Scene, debouncer and pipeline for one vehicle.
///
/// Usable directly for lock-step processing, or moved onto its own thread
/// with [`spawn`].
pub struct DetectorNode {
    scene: Scene,
    debouncer: StateDebouncer,
    pipeline: Pipeline,
    status: SharedStatus,
}

impl DetectorNode {
    pub fn new(config: &DrishtiConfig, classifier: Box<dyn LightClassifier>) -> Self {
        Self {
            scene: Scene::default(),
            debouncer: StateDebouncer::new(config.debounce.clone()),
            pipeline: Pipeline::new(config, classifier),
            status: SharedStatus::default(),
        }
    }

    #[inline]
    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn debouncer(&self) -> &StateDebouncer {
        &self.debouncer
    }

    /// Apply one input and, if it was an image, run a pass.
    ///
    /// Returns the pass outcome for images, `None` otherwise.
    pub fn handle(&mut self, input: Input) -> Option<PassOutcome> {
        match self.apply(input) {
            Applied::Frame => Some(self.run_pass()),
            Applied::Updated | Applied::Shutdown => None,
        }
    }

    fn apply(&mut self, input: Input) -> Applied {
        match input {
            Input::Pose(pose) => self.scene.pose = Some(pose),
            Input::Path(path) => {
                log::debug!("Path updated: {} waypoints", path.len());
                self.scene.path = Some(path);
            }
            Input::Lights(lights) => self.scene.lights = lights,
            Input::Image(frame) => {
                self.scene.frame = Some(frame);
                self.status.lock().frames_received += 1;
                return Applied::Frame;
            }
            Input::Shutdown => return Applied::Shutdown,
        }
        Applied::Updated
    }

    fn run_pass(&mut self) -> PassOutcome {
        let outcome = self.pipeline.run(&self.scene, &mut self.debouncer);

        let mut status = self.status.lock();
        status.passes += 1;
        match &outcome {
            PassOutcome::NoResult(missing) => {
                status.passes_without_result += 1;
                log::debug!("No result: missing {:?}", missing);
            }
            PassOutcome::Emit(report) => {
                if status.last_output != Some(report.waypoint) {
                    log::info!("Stop waypoint: {}", report.waypoint);
                }
                status.last_output = Some(report.waypoint);
                if report.observation.is_some() {
                    status.last_observation = report.observation;
                }
            }
        }
        outcome
    }

    /// Detector loop; returns when shut down or all senders are gone.
    pub fn run(mut self, inputs: Receiver<Input>, outputs: Sender<StopWaypoint>) {
        log::info!(
            "Detector thread starting (classifier: {})",
            self.pipeline.classifier_name()
        );

        for input in inputs.iter() {
            match self.apply(input) {
                Applied::Updated => {}
                Applied::Shutdown => break,
                Applied::Frame => {
                    let backlog = inputs.len();
                    {
                        let mut status = self.status.lock();
                        status.peak_backlog = status.peak_backlog.max(backlog);
                    }
                    if let Some(waypoint) = self.run_pass().waypoint()
                        && outputs.send(waypoint).is_err()
                    {
                        log::warn!("Output receiver dropped, stopping detector");
                        break;
                    }
                }
            }
        }

        log::info!("Detector thread stopped");
    }
}

/// Handle to a detector running on its own thread.
pub struct NodeHandle {
    inputs: Sender<Input>,
    outputs: Receiver<StopWaypoint>,
    status: SharedStatus,
    handle: JoinHandle<()>,
}

/// Start the detector thread.
pub fn spawn(config: &DrishtiConfig, classifier: Box<dyn LightClassifier>) -> Result<NodeHandle> {
    let node = DetectorNode::new(config, classifier);
    let status = node.status();
    let (input_tx, input_rx) = bounded(config.node.input_queue.max(1));
    let (output_tx, output_rx) = unbounded();

    let handle = thread::Builder::new()
        .name("detector".into())
        .spawn(move || node.run(input_rx, output_tx))?;

    Ok(NodeHandle {
        inputs: input_tx,
        outputs: output_rx,
        status,
        handle,
    })
}

impl NodeHandle {
    /// Queue an input, blocking while the channel is full.
    pub fn send(&self, input: Input) -> Result<()> {
        self.inputs
            .send(input)
            .map_err(|_| Error::ChannelClosed("detector input"))
    }

    /// Extra producer handle for another input stream.
    pub fn sender(&self) -> Sender<Input> {
        self.inputs.clone()
    }

    /// Published stop waypoints.
    pub fn outputs(&self) -> &Receiver<StopWaypoint> {
        &self.outputs
    }

    pub fn status(&self) -> NodeStatus {
        self.status.lock().clone()
    }

    /// Stop the detector and wait for it. Returns the final counters and
    /// any waypoints still queued.
    pub fn shutdown(self) -> Result<(NodeStatus, Vec<StopWaypoint>)> {
        // A closed channel means the thread already exited
        let _ = self.inputs.send(Input::Shutdown);
        drop(self.inputs);
        self.handle
            .join()
            .map_err(|_| Error::Other("detector thread panicked".into()))?;
        let pending = self.outputs.try_iter().collect();
        let status = self.status.lock().clone();
        Ok((status, pending))
    }
}
