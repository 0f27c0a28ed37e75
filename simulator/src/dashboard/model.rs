use crate::workflow::drive::WheelPowers;
use crate::workflow::runner::{FrameReport, Runner};
use rovercore::hardware::Clock;
use rovercore::telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Live rover status served at `/status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusModel {
    pub frame: u64,
    pub lane_center_x: Option<i32>,
    pub stop_line: bool,
    pub wheels: WheelPowers,
    pub baseline_ema: Option<f32>,
    pub consecutive_count: u32,
    pub avoiding: bool,
    pub current_point: Option<String>,
    pub visited: Vec<String>,
    pub metrics: MetricsSnapshot,
}

impl StatusModel {
    pub fn capture<C: Clock>(report: &FrameReport, runner: &Runner<C>, wheels: WheelPowers) -> Self {
        let hazard = runner.hazard_state();
        let tracker = runner.tracker();
        Self {
            frame: report.index,
            lane_center_x: report.lane.center_x,
            stop_line: report.lane.stop_line,
            wheels,
            baseline_ema: hazard.baseline_ema,
            consecutive_count: hazard.consecutive_count,
            avoiding: report.avoided(),
            current_point: tracker.current_point().map(str::to_string),
            visited: tracker.visited().to_vec(),
            metrics: runner.metrics(),
        }
    }
}
