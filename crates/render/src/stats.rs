use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Counters kept by the frame loop across its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Frames that reached presentation.
    pub frames: u64,
    pub uploads: u64,
    pub accumulation_resets: u64,
    pub resizes: u64,
    pub failed_resizes: u64,
    pub dispatches: u64,
    pub failed_dispatches: u64,
    pub failed_uploads: u64,
}

/// Sliding window of recent frame times.
#[derive(Debug)]
pub struct FrameTimer {
    history: VecDeque<Duration>,
    capacity: usize,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(dt);
    }

    pub fn count(&self) -> usize {
        self.history.len()
    }

    pub fn average(&self) -> Duration {
        if self.history.is_empty() {
            return Duration::ZERO;
        }
        self.history.iter().sum::<Duration>() / self.history.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.history.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.history.iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Frames per second over the window, 0 when empty.
    pub fn fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }
}
