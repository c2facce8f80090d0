use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the frame capture loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Time between captures
    /// Default: 500 ms (2 frames per second)
    pub frame_interval_ms: u64,

    /// Frames allowed outstanding (awaiting the server or the caller) before new
    /// captures are dropped
    pub max_in_flight: usize,

    /// Capacity of the outcome channel handed to the caller
    pub outcome_buffer: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 500,
            max_in_flight: 8,
            outcome_buffer: 100,
        }
    }
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    /// At least one submission, otherwise every tick would be dropped
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }

    /// tokio's bounded channel needs a non-zero capacity
    pub fn outcome_buffer(&self) -> usize {
        self.outcome_buffer.max(1)
    }
}
