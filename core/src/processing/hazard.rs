use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::hardware::{Actuator, Clock};
use crate::math::morphology::MorphologyHelper;
use crate::prelude::{ControlError, ControlResult};
use crate::processing::avoidance::{AvoidanceManeuver, ManeuverReport};
use crate::telemetry::log::LogManager;

/// Adaptive threshold, debounce and cooldown parameters for pothole detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub ema_alpha: f32,
    /// A frame is a candidate when its fraction drops below `baseline * ratio`.
    pub ratio: f32,
    /// Absolute floor of the trigger threshold.
    pub min_abs: f32,
    pub required_frames: u32,
    pub cooldown_secs: f64,
    /// The baseline only adapts while the fraction stays above `baseline * hold_ratio`.
    pub hold_ratio: f32,
    pub kernel_size: usize,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            ema_alpha: 0.05,
            ratio: 0.4,
            min_abs: 0.01,
            required_frames: 4,
            cooldown_secs: 60.0,
            hold_ratio: 0.9,
            kernel_size: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardState {
    /// `None` until the first measurement arrives.
    pub baseline_ema: Option<f32>,
    pub consecutive_count: u32,
    pub last_trigger_time: Option<f64>,
}

/// Outcome of one hazard update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardDecision {
    /// First measurement; it only seeds the baseline.
    Calibrating,
    Clear,
    /// Qualifying frames seen so far, short of the required run.
    Pending(u32),
    Trigger,
}

/// Tracks the free-surface baseline and decides when to run the avoidance sweep.
pub struct HazardMonitor<C: Clock> {
    config: HazardConfig,
    state: HazardState,
    kernel: Array2<bool>,
    clock: C,
    logger: LogManager,
}

impl<C: Clock> HazardMonitor<C> {
    pub fn new(config: HazardConfig, clock: C) -> Self {
        let kernel = MorphologyHelper::ellipse(config.kernel_size);
        Self {
            config,
            state: HazardState::default(),
            kernel,
            clock,
            logger: LogManager::new("hazard"),
        }
    }

    pub fn state(&self) -> &HazardState {
        &self.state
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Free-surface fraction of a ROI mask after speckle removal (open, then close).
    pub fn measure(&self, roi: ArrayView2<u8>) -> ControlResult<f32> {
        let total = roi.len();
        if total == 0 {
            return Err(ControlError::EmptyRegion(format!(
                "hazard ROI is {}x{}",
                roi.nrows(),
                roi.ncols()
            )));
        }
        let opened = MorphologyHelper::open(roi, &self.kernel);
        let cleaned = MorphologyHelper::close(opened.view(), &self.kernel);
        let free = cleaned.iter().filter(|&&value| value != 0).count();
        Ok(free as f32 / total as f32)
    }

    /// Feeds one measured fraction through the baseline, threshold and debounce gates.
    pub fn update(&mut self, fraction: f32) -> HazardDecision {
        let Some(previous) = self.state.baseline_ema else {
            self.state.baseline_ema = Some(fraction);
            return HazardDecision::Calibrating;
        };

        let baseline = if fraction > previous * self.config.hold_ratio {
            self.config.ema_alpha * fraction + (1.0 - self.config.ema_alpha) * previous
        } else {
            previous
        };
        self.state.baseline_ema = Some(baseline);

        let threshold = self.config.min_abs.max(baseline * self.config.ratio);
        let candidate = fraction < threshold;
        let now = self.clock.now();
        let cooled = self
            .state
            .last_trigger_time
            .map_or(true, |last| now - last > self.config.cooldown_secs);

        if candidate && cooled {
            self.state.consecutive_count += 1;
        } else {
            self.state.consecutive_count = 0;
        }

        if self.state.consecutive_count >= self.config.required_frames.max(1) {
            self.logger.record(&format!(
                "pothole: fraction={:.3} baseline={:.3} threshold={:.3}",
                fraction, baseline, threshold
            ));
            self.state.consecutive_count = 0;
            self.state.last_trigger_time = Some(now);
            HazardDecision::Trigger
        } else if self.state.consecutive_count > 0 {
            HazardDecision::Pending(self.state.consecutive_count)
        } else {
            HazardDecision::Clear
        }
    }

    /// Measures, updates and, on a trigger, runs `maneuver` to completion.
    pub fn check_and_handle<A: Actuator + ?Sized>(
        &mut self,
        roi: ArrayView2<u8>,
        maneuver: &AvoidanceManeuver,
        actuator: &mut A,
    ) -> ControlResult<(HazardDecision, Option<ManeuverReport>)> {
        let fraction = self.measure(roi)?;
        let decision = self.update(fraction);
        if decision != HazardDecision::Trigger {
            return Ok((decision, None));
        }
        let report = maneuver.execute(actuator, &self.clock);
        Ok((decision, Some(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{ActuatorCommand, ManualClock, RecordingActuator};

    fn monitor() -> (HazardMonitor<ManualClock>, ManualClock) {
        let clock = ManualClock::starting_at(1_000.0);
        (HazardMonitor::new(HazardConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn first_measurement_only_seeds_baseline() {
        let (mut hazard, _) = monitor();
        assert_eq!(hazard.update(0.0), HazardDecision::Calibrating);
        assert_eq!(hazard.state().baseline_ema, Some(0.0));
        assert_eq!(hazard.state().consecutive_count, 0);
    }

    #[test]
    fn triggers_on_fourth_low_frame_and_not_again_in_cooldown() {
        let (mut hazard, clock) = monitor();
        for _ in 0..10 {
            assert_ne!(hazard.update(0.5), HazardDecision::Trigger);
            clock.advance(0.05);
        }
        let decisions: Vec<HazardDecision> = (0..5)
            .map(|_| {
                let decision = hazard.update(0.05);
                clock.advance(0.05);
                decision
            })
            .collect();
        assert_eq!(
            decisions,
            vec![
                HazardDecision::Pending(1),
                HazardDecision::Pending(2),
                HazardDecision::Pending(3),
                HazardDecision::Trigger,
                HazardDecision::Clear,
            ]
        );
        assert_eq!(hazard.state().consecutive_count, 0);
    }

    #[test]
    fn single_good_frame_resets_the_debounce() {
        let (mut hazard, _) = monitor();
        hazard.update(0.5);
        hazard.update(0.05);
        hazard.update(0.05);
        assert_eq!(hazard.update(0.5), HazardDecision::Clear);
        assert_eq!(hazard.update(0.05), HazardDecision::Pending(1));
    }

    #[test]
    fn trigger_is_possible_again_after_cooldown() {
        let (mut hazard, clock) = monitor();
        hazard.update(0.5);
        for _ in 0..4 {
            hazard.update(0.05);
        }
        assert!(hazard.state().last_trigger_time.is_some());
        clock.advance(60.5);
        let decisions: Vec<HazardDecision> = (0..4).map(|_| hazard.update(0.05)).collect();
        assert_eq!(decisions[3], HazardDecision::Trigger);
    }

    #[test]
    fn baseline_holds_during_deep_drop_and_steps_during_mild_drift() {
        let (mut hazard, _) = monitor();
        hazard.update(0.5);
        hazard.update(0.1);
        assert_eq!(hazard.state().baseline_ema, Some(0.5));

        let mut previous = 0.5f32;
        for _ in 0..50 {
            hazard.update(previous * 0.95);
            let baseline = hazard.state().baseline_ema.unwrap();
            let max_step = hazard.config().ema_alpha * (previous - previous * 0.9);
            assert!(baseline <= previous);
            assert!(previous - baseline <= max_step + 1e-6);
            previous = baseline;
        }
    }

    #[test]
    fn floor_applies_when_baseline_is_tiny() {
        let (mut hazard, _) = monitor();
        hazard.update(0.02);
        // 0.02 * 0.4 = 0.008 sits below the 0.01 floor, so 0.009 still qualifies.
        assert_eq!(hazard.update(0.009), HazardDecision::Pending(1));
    }

    #[test]
    fn measure_ignores_speckle_and_rejects_empty_roi() {
        let (hazard, _) = monitor();
        let mut roi = Array2::<u8>::zeros((40, 40));
        roi[[10, 10]] = 255;
        roi[[30, 5]] = 255;
        assert_eq!(hazard.measure(roi.view()).unwrap(), 0.0);

        let mut solid = Array2::<u8>::zeros((40, 40));
        solid.slice_mut(ndarray::s![.., 0..20]).fill(255);
        assert!((hazard.measure(solid.view()).unwrap() - 0.5).abs() < 1e-6);

        let empty = Array2::<u8>::zeros((0, 40));
        assert!(matches!(
            hazard.measure(empty.view()),
            Err(ControlError::EmptyRegion(_))
        ));
    }

    #[test]
    fn trigger_runs_the_maneuver_on_the_monitor_clock() {
        let (mut hazard, clock) = monitor();
        let maneuver = AvoidanceManeuver::default();
        let mut actuator = RecordingActuator::new();
        let bright = Array2::<u8>::from_elem((20, 20), 255);
        let dark = Array2::<u8>::zeros((20, 20));

        hazard
            .check_and_handle(bright.view(), &maneuver, &mut actuator)
            .unwrap();
        let mut last = None;
        for _ in 0..4 {
            last = Some(
                hazard
                    .check_and_handle(dark.view(), &maneuver, &mut actuator)
                    .unwrap(),
            );
        }
        let (decision, report) = last.unwrap();
        assert_eq!(decision, HazardDecision::Trigger);
        assert!(report.unwrap().is_clean());
        assert_eq!(actuator.last(), Some(ActuatorCommand::Stop));
        assert!(clock.now() >= 1_000.0 + maneuver.nominal_duration().as_secs_f64() - 1e-6);
    }
}
