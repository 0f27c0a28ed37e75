use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters for one control-loop run.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub frames: usize,
    pub lane_lost: usize,
    pub avoidances: usize,
    pub waypoint_reports: usize,
    pub sector_captures: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_frame(&self) {
        self.update(|m| m.frames += 1);
    }

    pub fn record_lane_lost(&self) {
        self.update(|m| m.lane_lost += 1);
    }

    pub fn record_avoidance(&self) {
        self.update(|m| m.avoidances += 1);
    }

    pub fn record_waypoint_report(&self) {
        self.update(|m| m.waypoint_reports += 1);
    }

    pub fn record_sector_capture(&self) {
        self.update(|m| m.sector_captures += 1);
    }

    pub fn record_error(&self) {
        self.update(|m| m.errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }

    fn update<F: FnOnce(&mut MetricsSnapshot)>(&self, apply: F) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let metrics = MetricsRecorder::new();
        metrics.record_frame();
        metrics.record_frame();
        metrics.record_error();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames, 2);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.avoidances, 0);
    }
}
