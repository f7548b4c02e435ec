//! Temporal debouncing of per-frame light-state observations.
//!
//! The raw classification flickers from frame to frame. A state is only
//! accepted once it has been observed `threshold` frames in a row; until
//! then the previously latched waypoint is re-emitted unchanged.
//!
//! # State machine
//!
//! ```text
//!   observe(s):
//!     s != candidate  ─▶ candidate = s, count restarts at 1
//!     s == candidate  ─▶ count += 1
//!     count >= threshold ─▶ latch(candidate)   (every such frame)
//!     emit latched
//! ```
//!
//! Latching RED (and YELLOW when `stop_on_yellow` is set) stores the current
//! stop-line waypoint; any other state latches "no stop".

use serde::{Deserialize, Serialize};

use crate::core::{LightState, StopWaypoint};

/// Debounce settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Consecutive identical observations required before latching.
    ///
    /// Default: 3
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Treat a stable YELLOW as a stop condition.
    ///
    /// Default: false (only RED stops)
    #[serde(default)]
    pub stop_on_yellow: bool,
}

fn default_threshold() -> u32 {
    3
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            stop_on_yellow: false,
        }
    }
}

/// Debouncer memory. Lives for the whole process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DebounceState {
    /// State currently being counted
    pub candidate: LightState,
    /// Consecutive observations of `candidate` (saturates at the threshold)
    pub count: u32,
    /// Last accepted output
    pub latched_waypoint: StopWaypoint,
    /// State that produced `latched_waypoint`
    pub latched_state: LightState,
}

/// Hysteresis filter from raw light state to stop waypoint.
#[derive(Clone, Debug)]
pub struct StateDebouncer {
    config: DebounceConfig,
    state: DebounceState,
}

impl StateDebouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            state: DebounceState::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    /// Currently latched output, without feeding an observation.
    #[inline]
    pub fn latched(&self) -> StopWaypoint {
        self.state.latched_waypoint
    }

    /// Whether a stable `state` means the vehicle has to stop.
    pub fn requires_stop(&self, state: LightState) -> bool {
        match state {
            LightState::Red => true,
            LightState::Yellow => self.config.stop_on_yellow,
            LightState::Green | LightState::Unknown => false,
        }
    }

    /// Feed one raw observation and return the waypoint to publish.
    ///
    /// `stop_waypoint` is the route index of the associated stop line for
    /// this frame, if any.
    pub fn observe(&mut self, raw: LightState, stop_waypoint: Option<usize>) -> StopWaypoint {
        let threshold = self.config.threshold.max(1);

        if raw != self.state.candidate {
            log::trace!(
                "Debounce candidate {} -> {} (count reset)",
                self.state.candidate,
                raw
            );
            self.state.candidate = raw;
            self.state.count = 0;
        }
        self.state.count = (self.state.count + 1).min(threshold);

        if self.state.count >= threshold {
            let waypoint = if self.requires_stop(raw) {
                StopWaypoint(stop_waypoint)
            } else {
                StopWaypoint::NONE
            };
            if waypoint != self.state.latched_waypoint || raw != self.state.latched_state {
                log::debug!("Latched {} ({})", waypoint, raw);
            }
            self.state.latched_waypoint = waypoint;
            self.state.latched_state = raw;
        }

        self.state.latched_waypoint
    }

    /// Back to the power-on state.
    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LightState::*;

    fn debouncer() -> StateDebouncer {
        StateDebouncer::new(DebounceConfig::default())
    }

    #[test]
    fn test_initial_state() {
        let d = debouncer();
        assert_eq!(d.state().candidate, Unknown);
        assert_eq!(d.state().count, 0);
        assert_eq!(d.latched(), StopWaypoint::NONE);
    }

    #[test]
    fn test_red_latches_on_third_observation() {
        let mut d = debouncer();
        assert_eq!(d.observe(Red, Some(2)), StopWaypoint::NONE);
        assert_eq!(d.observe(Red, Some(2)), StopWaypoint::NONE);
        assert_eq!(d.observe(Red, Some(2)), StopWaypoint::at(2));
        assert_eq!(d.state().latched_state, Red);
    }

    #[test]
    fn test_red_green_red_sequence() {
        let mut d = debouncer();
        let outputs: Vec<_> = [Red, Red, Red, Green, Red, Red]
            .into_iter()
            .map(|s| d.observe(s, Some(7)))
            .collect();
        assert_eq!(
            outputs,
            vec![
                StopWaypoint::NONE,
                StopWaypoint::NONE,
                StopWaypoint::at(7),
                StopWaypoint::at(7),
                StopWaypoint::at(7),
                StopWaypoint::at(7),
            ]
        );
        // GREEN reset the run; two REDs are not yet enough to re-latch
        assert_eq!(d.state().candidate, Red);
        assert_eq!(d.state().count, 2);

        // Third RED of the new run re-latches with the current waypoint
        assert_eq!(d.observe(Red, Some(9)), StopWaypoint::at(9));
    }

    #[test]
    fn test_green_clears_after_threshold() {
        let mut d = debouncer();
        for _ in 0..3 {
            d.observe(Red, Some(4));
        }
        assert_eq!(d.observe(Green, Some(4)), StopWaypoint::at(4));
        assert_eq!(d.observe(Green, Some(4)), StopWaypoint::at(4));
        assert_eq!(d.observe(Green, Some(4)), StopWaypoint::NONE);
        assert_eq!(d.state().latched_state, Green);
    }

    #[test]
    fn test_flicker_never_latches() {
        let mut d = debouncer();
        for s in [Red, Green, Red, Yellow, Red, Unknown, Red, Green] {
            assert_eq!(d.observe(s, Some(1)), StopWaypoint::NONE);
        }
    }

    #[test]
    fn test_yellow_is_not_a_stop_by_default() {
        let mut d = debouncer();
        for _ in 0..3 {
            d.observe(Yellow, Some(5));
        }
        assert_eq!(d.latched(), StopWaypoint::NONE);
        assert_eq!(d.state().latched_state, Yellow);
    }

    #[test]
    fn test_yellow_stops_when_configured() {
        let mut d = StateDebouncer::new(DebounceConfig {
            stop_on_yellow: true,
            ..DebounceConfig::default()
        });
        for _ in 0..3 {
            d.observe(Yellow, Some(5));
        }
        assert_eq!(d.latched(), StopWaypoint::at(5));
    }

    #[test]
    fn test_stable_state_is_idempotent() {
        let mut d = debouncer();
        for _ in 0..3 {
            d.observe(Red, Some(3));
        }
        let before = *d.state();
        assert_eq!(d.observe(Red, Some(3)), StopWaypoint::at(3));
        assert_eq!(*d.state(), before);
    }

    #[test]
    fn test_threshold_one_latches_immediately() {
        let mut d = StateDebouncer::new(DebounceConfig {
            threshold: 1,
            stop_on_yellow: false,
        });
        assert_eq!(d.observe(Red, Some(8)), StopWaypoint::at(8));
        assert_eq!(d.observe(Green, Some(8)), StopWaypoint::NONE);
    }

    #[test]
    fn test_reset() {
        let mut d = debouncer();
        for _ in 0..3 {
            d.observe(Red, Some(3));
        }
        d.reset();
        assert_eq!(*d.state(), DebounceState::default());
    }
}
