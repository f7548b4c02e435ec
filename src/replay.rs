//! JSON-lines replay of recorded detector inputs.
//!
//! One object per line, tagged by `type`:
//!
//! ```text
//! {"type":"pose","t_us":0,"position":{"x":0,"y":0,"z":0},"orientation":{"x":0,"y":0,"z":0,"w":1}}
//! {"type":"path","points":[[0,0,0],[10,0,0],[20,0,0]]}
//! {"type":"lights","lights":[{"position":{"x":19,"y":1,"z":0},"state":"RED"}]}
//! {"type":"image","t_us":100000,"stamp_us":100000,"file":"frames/0001.png"}
//! ```
//!
//! `t_us` is optional and only used for real-time pacing. Image `file` paths
//! are relative to the replay file; without a file a black frame of
//! `width × height` (default 800×600) is used. Blank lines and lines starting
//! with `#` are skipped.

use std::fs;
use std::path::{Path as FsPath, PathBuf};

use serde::Deserialize;

use crate::core::{ImageFrame, Point3, Pose, Quaternion, TrackedLight};
use crate::detection::Path;
use crate::error::{Error, Result};
use crate::node::Input;

/// One recorded input.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Pose {
        position: Point3,
        #[serde(default)]
        orientation: Quaternion,
    },
    Path {
        points: Vec<[f64; 3]>,
    },
    Lights {
        #[serde(default)]
        lights: Vec<TrackedLight>,
    },
    Image {
        stamp_us: u64,
        #[serde(default = "default_width")]
        width: u32,
        #[serde(default = "default_height")]
        height: u32,
        #[serde(default)]
        file: Option<PathBuf>,
    },
}

/// Largest synthetic frame a replay may ask for (pixels).
const MAX_BLANK_PIXELS: u64 = 8192 * 8192;

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

/// A parsed line with its position in the file.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayRecord {
    /// 1-based line number
    pub line: usize,
    /// Recording time for pacing
    pub t_us: Option<u64>,
    pub event: ReplayEvent,
}

/// Parsed replay file.
#[derive(Clone, Debug, Default)]
pub struct Replay {
    records: Vec<ReplayRecord>,
    base_dir: PathBuf,
}

impl Replay {
    /// Read and parse a replay file.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .map(FsPath::to_path_buf)
            .unwrap_or_default();
        Self::parse(&text, base_dir)
    }

    /// Parse replay text; image files resolve against `base_dir`.
    pub fn parse(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut records = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            records.push(parse_line(trimmed, line)?);
        }
        log::debug!("Replay parsed: {} records", records.len());
        Ok(Self {
            records,
            base_dir: base_dir.into(),
        })
    }

    #[inline]
    pub fn records(&self) -> &[ReplayRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of image records.
    pub fn frame_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.event, ReplayEvent::Image { .. }))
            .count()
    }

    /// Convert a record into a detector input, loading its image if any.
    pub fn to_input(&self, record: &ReplayRecord) -> Result<Input> {
        record
            .event
            .to_input(&self.base_dir)
            .map_err(|e| match e {
                Error::Replay { .. } => e,
                other => Error::Replay {
                    line: record.line,
                    message: other.to_string(),
                },
            })
    }
}

fn parse_line(text: &str, line: usize) -> Result<ReplayRecord> {
    let replay_error = |e: serde_json::Error| Error::Replay {
        line,
        message: e.to_string(),
    };
    let value: serde_json::Value = serde_json::from_str(text).map_err(replay_error)?;
    let t_us = value.get("t_us").and_then(serde_json::Value::as_u64);
    let event: ReplayEvent = serde_json::from_value(value).map_err(replay_error)?;
    Ok(ReplayRecord { line, t_us, event })
}

impl ReplayEvent {
    /// Detector input for this event.
    pub fn to_input(&self, base_dir: &FsPath) -> Result<Input> {
        Ok(match self {
            ReplayEvent::Pose {
                position,
                orientation,
            } => Input::Pose(Pose::new(*position, *orientation)),
            ReplayEvent::Path { points } => Input::Path(Path::from_positions(
                points.iter().map(|&[x, y, z]| Point3::new(x, y, z)),
            )),
            ReplayEvent::Lights { lights } => Input::Lights(lights.clone()),
            ReplayEvent::Image {
                stamp_us,
                width,
                height,
                file,
            } => {
                let frame = match file {
                    Some(file) => {
                        let image = image::open(base_dir.join(file))?.to_rgb8();
                        ImageFrame::new(*stamp_us, image)
                    }
                    None => {
                        let pixels = u64::from(*width) * u64::from(*height);
                        if pixels > MAX_BLANK_PIXELS {
                            return Err(Error::Other(format!(
                                "image {}x{} exceeds {} pixels",
                                width, height, MAX_BLANK_PIXELS
                            )));
                        }
                        ImageFrame::blank(*stamp_us, *width, *height)
                    }
                };
                Input::Image(frame)
            }
        })
    }
}
