//! Configuration for Drishti
//!
//! Loads detector configuration from a TOML file. Every section and field has
//! a default, so a partial file (or none at all) gives the simulator setup.
//!
//! ```toml
//! [stop_line]
//! positions = [[1148.56, 1184.65], [1559.2, 1158.43]]
//!
//! [association]
//! stop_line_radius = 50.0
//!
//! [debounce]
//! threshold = 3
//!
//! [classifier]
//! kind = "color"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classifier::ClassifierConfig;
use crate::core::StopLine;
use crate::detection::{AssociationConfig, CameraConfig, DebounceConfig, SearchRegionConfig};
use crate::error::{Error, Result};
use crate::pipeline::PipelineConfig;

/// Top-level detector configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DrishtiConfig {
    #[serde(default)]
    pub stop_line: StopLineConfig,
    #[serde(default)]
    pub association: AssociationConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub search_region: SearchRegionConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Static stop-line map
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StopLineConfig {
    /// Stop-line positions as `[x, y]` world coordinates
    ///
    /// Default: the eight intersections of the simulator highway loop.
    #[serde(default = "default_stop_line_positions")]
    pub positions: Vec<[f64; 2]>,
}

fn default_stop_line_positions() -> Vec<[f64; 2]> {
    vec![
        [1148.56, 1184.65],
        [1559.2, 1158.43],
        [2122.14, 1526.79],
        [2175.237, 1795.71],
        [1493.29, 2947.67],
        [821.96, 2905.8],
        [161.76, 2303.82],
        [351.84, 1574.65],
    ]
}

impl Default for StopLineConfig {
    fn default() -> Self {
        Self {
            positions: default_stop_line_positions(),
        }
    }
}

/// Detector node threading
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Capacity of the bounded input channel (default: 64)
    #[serde(default = "default_input_queue")]
    pub input_queue: usize,
}

fn default_input_queue() -> usize {
    64
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            input_queue: default_input_queue(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DrishtiConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    /// Save configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Stop lines as domain values.
    pub fn stop_lines(&self) -> Vec<StopLine> {
        self.stop_line
            .positions
            .iter()
            .map(|&[x, y]| StopLine::new(x, y))
            .collect()
    }

    /// Reject settings the detector cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stop_line.positions.is_empty() {
            return Err(Error::Config("stop_line.positions is empty".into()));
        }
        if self
            .stop_line
            .positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(Error::Config("stop_line.positions must be finite".into()));
        }

        let radius = self.association.stop_line_radius;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::Config(format!(
                "association.stop_line_radius must be positive, got {}",
                radius
            )));
        }
        if let Some(r) = self.association.light_radius
            && !(r.is_finite() && r > 0.0)
        {
            return Err(Error::Config(format!(
                "association.light_radius must be positive, got {}",
                r
            )));
        }

        let cam = &self.camera;
        if !(cam.focal_length.is_finite() && cam.focal_length > 0.0) {
            return Err(Error::Config(format!(
                "camera.focal_length must be positive, got {}",
                cam.focal_length
            )));
        }
        if cam.image_width == 0 || cam.image_height == 0 {
            return Err(Error::Config(format!(
                "camera image size must be non-zero, got {}x{}",
                cam.image_width, cam.image_height
            )));
        }
        let planes_ok = cam.near.is_finite() && cam.far.is_finite();
        if !(planes_ok && cam.near > 0.0 && cam.near < cam.far) {
            return Err(Error::Config(format!(
                "camera clip planes need 0 < near < far, got near={} far={}",
                cam.near, cam.far
            )));
        }

        if !(cam.mount_pitch_deg.is_finite() && cam.mount_yaw_deg.is_finite()) {
            return Err(Error::Config(format!(
                "camera mount angles must be finite, got pitch={} yaw={}",
                cam.mount_pitch_deg, cam.mount_yaw_deg
            )));
        }

        let region = &self.search_region;
        if [region.half_width, region.above, region.below]
            .iter()
            .any(|f| !(f.is_finite() && *f >= 0.0))
        {
            return Err(Error::Config(format!(
                "search_region factors must be finite and non-negative, got {}/{}/{}",
                region.half_width, region.above, region.below
            )));
        }

        if self.debounce.threshold == 0 {
            return Err(Error::Config("debounce.threshold must be at least 1".into()));
        }
        if self.node.input_queue == 0 {
            return Err(Error::Config("node.input_queue must be at least 1".into()));
        }
        Ok(())
    }
}

impl std::str::FromStr for DrishtiConfig {
    type Err = Error;

    /// Parse and validate TOML text.
    fn from_str(s: &str) -> Result<Self> {
        let config: DrishtiConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
