//! Frame-to-frame stability tracking for auto-capture.
//!
//! One tracker per capture session. The caller feeds every per-frame
//! [`DetectionResult`] in arrival order together with a monotonic timestamp;
//! the tracker reports [`StabilityEvent::BecameStable`] exactly once per
//! stable episode, when the boundary has stayed within the motion threshold
//! for the configured hold duration.
//!
//! `observe` takes `&mut self`, so the single-writer, in-order discipline
//! required by the timer logic is enforced at compile time.

use crate::quad::Quadrilateral;
use crate::DetectionResult;

/// Stability tracking configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StabilityConfig {
    /// Per-vertex motion threshold in pixels. A tick is stable when every
    /// vertex moved at most this far since the previous frame.
    pub motion_threshold_px: f64,
    /// Continuous stable time required before the stable event fires.
    pub hold_duration_ms: i64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            motion_threshold_px: 5.0,
            hold_duration_ms: 2000,
        }
    }
}

/// Outcome of one `observe` tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityEvent {
    /// Nothing to report this tick.
    Pending,
    /// The boundary just completed a full hold window; fires once per
    /// stable episode.
    BecameStable,
}

/// Per-session stability state machine.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    config: StabilityConfig,
    last_vertices: Option<Quadrilateral>,
    started_ms: Option<i64>,
    is_stable: bool,
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            last_vertices: None,
            started_ms: None,
            is_stable: false,
        }
    }

    /// Whether the current episode has reached the stable state.
    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    /// Clear all per-session state (new capture session, or session teardown).
    pub fn reset(&mut self) {
        self.last_vertices = None;
        self.started_ms = None;
        self.is_stable = false;
    }

    /// Feed one detection result observed at `now_ms`.
    ///
    /// A `NotDetected` frame resets the episode. The first sighting only
    /// establishes the baseline; the hold timer starts on the first
    /// subsequent stable tick. The newest vertices always become the next
    /// baseline, whether or not stability held.
    pub fn observe(&mut self, result: &DetectionResult, now_ms: i64) -> StabilityEvent {
        let vertices = match result {
            DetectionResult::Detected { vertices, .. } => *vertices,
            DetectionResult::NotDetected => {
                self.reset();
                return StabilityEvent::Pending;
            }
        };

        let mut event = StabilityEvent::Pending;
        match self.last_vertices {
            None => {
                // Baseline only.
            }
            Some(previous) if self.within_threshold(&previous, &vertices) => {
                match self.started_ms {
                    None => self.started_ms = Some(now_ms),
                    Some(started) => {
                        if now_ms - started >= self.config.hold_duration_ms && !self.is_stable {
                            self.is_stable = true;
                            event = StabilityEvent::BecameStable;
                            tracing::debug!(held_ms = now_ms - started, "document stable");
                        }
                    }
                }
            }
            Some(_) => {
                self.started_ms = None;
                self.is_stable = false;
            }
        }
        self.last_vertices = Some(vertices);
        event
    }

    fn within_threshold(&self, old: &Quadrilateral, new: &Quadrilateral) -> bool {
        let limit = self.config.motion_threshold_px * self.config.motion_threshold_px;
        old.points().iter().zip(new.points()).all(|(a, b)| {
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            dx * dx + dy * dy <= limit
        })
    }
}
