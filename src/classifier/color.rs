//! HSV color voting for lit signal lamps.
//!
//! Every sampled pixel that is bright and saturated enough to be a lit lamp
//! votes for RED, YELLOW or GREEN by hue. The winner needs both an absolute
//! number of votes and a share of all lit pixels; otherwise the frame reads
//! UNKNOWN. Dark housing, sky and road are filtered by the value/saturation
//! floor.

use serde::{Deserialize, Serialize};

use super::LightClassifier;
use crate::core::{ImageFrame, LightState};
use crate::detection::SearchRegion;
use crate::error::Result;

/// Color classifier thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorClassifierConfig {
    /// Minimum HSV value (0-255) for a pixel to count as lit (default: 150)
    #[serde(default = "default_min_value")]
    pub min_value: f32,

    /// Minimum HSV saturation (0-100) for a lit pixel (default: 40)
    #[serde(default = "default_min_saturation")]
    pub min_saturation: f32,

    /// Minimum votes for the winning color (default: 12)
    #[serde(default = "default_min_votes")]
    pub min_votes: u32,

    /// Minimum share of lit pixels held by the winner (default: 0.5)
    #[serde(default = "default_min_share")]
    pub min_share: f32,

    /// Sample every n-th pixel in both directions (default: 2)
    #[serde(default = "default_stride")]
    pub stride: u32,
}

fn default_min_value() -> f32 {
    150.0
}
fn default_min_saturation() -> f32 {
    40.0
}
fn default_min_votes() -> u32 {
    12
}
fn default_min_share() -> f32 {
    0.5
}
fn default_stride() -> u32 {
    2
}

impl Default for ColorClassifierConfig {
    fn default() -> Self {
        Self {
            min_value: default_min_value(),
            min_saturation: default_min_saturation(),
            min_votes: default_min_votes(),
            min_share: default_min_share(),
            stride: default_stride(),
        }
    }
}

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 { 0.0 } else { (delta / max) * 100.0 };

    (h, s, max * 255.0)
}

/// Per-color vote tally for one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorVotes {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
    /// Lit pixels, including ones with an unassigned hue
    pub lit: u32,
}

impl ColorVotes {
    fn winner(&self) -> (LightState, u32) {
        [
            (LightState::Red, self.red),
            (LightState::Yellow, self.yellow),
            (LightState::Green, self.green),
        ]
        .into_iter()
        .fold((LightState::Unknown, 0), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        })
    }
}

/// Classifies the lamp color from image pixels.
#[derive(Clone, Debug, Default)]
pub struct ColorClassifier {
    config: ColorClassifierConfig,
}

impl ColorClassifier {
    pub fn new(config: ColorClassifierConfig) -> Self {
        Self { config }
    }

    /// Tally lit pixels inside `region` (whole frame when `None`).
    pub fn votes(&self, frame: &ImageFrame, region: Option<&SearchRegion>) -> ColorVotes {
        let (x0, y0, x1, y1) = match region {
            Some(r) => (
                r.x0.min(frame.width()),
                r.y0.min(frame.height()),
                r.x1.min(frame.width()),
                r.y1.min(frame.height()),
            ),
            None => (0, 0, frame.width(), frame.height()),
        };
        let step = self.config.stride.max(1) as usize;

        let mut votes = ColorVotes::default();
        for y in (y0..y1).step_by(step) {
            for x in (x0..x1).step_by(step) {
                let [r, g, b] = frame.image.get_pixel(x, y).0;
                let (h, s, v) = rgb_to_hsv(r as f32, g as f32, b as f32);
                if v < self.config.min_value || s < self.config.min_saturation {
                    continue;
                }
                votes.lit += 1;
                if !(15.0..=340.0).contains(&h) {
                    votes.red += 1;
                } else if (20.0..=65.0).contains(&h) {
                    votes.yellow += 1;
                } else if (75.0..=200.0).contains(&h) {
                    votes.green += 1;
                }
            }
        }
        votes
    }

    /// Decide a state from a tally.
    pub fn decide(&self, votes: &ColorVotes) -> LightState {
        let (state, count) = votes.winner();
        if count < self.config.min_votes || votes.lit == 0 {
            return LightState::Unknown;
        }
        let share = count as f32 / votes.lit as f32;
        if share < self.config.min_share {
            return LightState::Unknown;
        }
        state
    }
}

impl LightClassifier for ColorClassifier {
    fn name(&self) -> &'static str {
        "color"
    }

    fn classify(
        &mut self,
        frame: &ImageFrame,
        region: Option<&SearchRegion>,
        _hint: Option<LightState>,
    ) -> Result<LightState> {
        let votes = self.votes(frame, region);
        let state = self.decide(&votes);
        log::trace!(
            "Color votes r={} y={} g={} lit={} -> {}",
            votes.red,
            votes.yellow,
            votes.green,
            votes.lit,
            state
        );
        Ok(state)
    }
}
