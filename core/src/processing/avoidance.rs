use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hardware::{Actuator, ActuatorError, ActuatorResult, Clock, Direction, Side};
use crate::telemetry::log::LogManager;

/// Side of the hazard the rover swings toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvoidanceSide {
    #[default]
    Left,
    Right,
}

/// Powers and hold times of the open-loop sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    pub side: AvoidanceSide,
    pub settle_secs: f64,
    pub reverse_power: i32,
    pub reverse_secs: f64,
    pub reverse_fallback_secs: f64,
    pub rotate_power: i32,
    pub rotate_secs: f64,
    pub creep_power: i32,
    pub creep_secs: f64,
    pub turn_outer_power: i32,
    pub turn_inner_power: i32,
    pub turn_secs: f64,
    pub fault_hold_secs: f64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            side: AvoidanceSide::Left,
            settle_secs: 0.12,
            reverse_power: 50,
            reverse_secs: 0.5,
            reverse_fallback_secs: 0.2,
            rotate_power: 25,
            rotate_secs: 1.8,
            creep_power: 50,
            creep_secs: 2.0,
            turn_outer_power: 60,
            turn_inner_power: 10,
            turn_secs: 1.8,
            fault_hold_secs: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageAction {
    Stop,
    Reverse(i32),
    Rotate(Direction, i32),
    Forward(i32),
    Differential { left: i32, right: i32 },
}

/// One timed step. `fault_hold` replaces `hold` when the action fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverStage {
    pub label: &'static str,
    pub action: StageAction,
    pub hold: Duration,
    pub fault_hold: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageFault {
    pub stage: &'static str,
    pub error: ActuatorError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManeuverReport {
    pub stages_run: usize,
    pub faults: Vec<StageFault>,
}

impl ManeuverReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Holds the actuator for the maneuver and stops it when dropped.
struct StopGuard<'a, A: Actuator + ?Sized> {
    actuator: &'a mut A,
}

impl<A: Actuator + ?Sized> Deref for StopGuard<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        self.actuator
    }
}

impl<A: Actuator + ?Sized> DerefMut for StopGuard<'_, A> {
    fn deref_mut(&mut self) -> &mut A {
        self.actuator
    }
}

impl<A: Actuator + ?Sized> Drop for StopGuard<'_, A> {
    fn drop(&mut self) {
        if let Err(err) = self.actuator.stop() {
            log::warn!("[avoid] final stop failed: {}", err);
        }
    }
}

/// Fixed open-loop sweep around a road hazard.
///
/// Runs to completion on the calling thread. Each stage is fault-contained: a
/// failing stage commands a stop and the sweep moves on, and the final stop is
/// issued however the stages went.
pub struct AvoidanceManeuver {
    stages: Vec<ManeuverStage>,
    logger: LogManager,
}

impl AvoidanceManeuver {
    pub fn new(stages: Vec<ManeuverStage>) -> Self {
        Self {
            stages,
            logger: LogManager::new("avoid"),
        }
    }

    pub fn from_config(config: &AvoidanceConfig) -> Self {
        let (rotation, outer_side) = match config.side {
            AvoidanceSide::Left => (Direction::CounterClockwise, Side::Left),
            AvoidanceSide::Right => (Direction::Clockwise, Side::Right),
        };
        let (left, right) = match outer_side {
            Side::Left => (config.turn_outer_power, config.turn_inner_power),
            Side::Right => (config.turn_inner_power, config.turn_outer_power),
        };
        let fault_hold = secs(config.fault_hold_secs);

        let stages = vec![
            ManeuverStage {
                label: "halt",
                action: StageAction::Stop,
                hold: secs(config.settle_secs),
                fault_hold,
            },
            ManeuverStage {
                label: "reverse",
                action: StageAction::Reverse(config.reverse_power),
                hold: secs(config.reverse_secs),
                fault_hold: secs(config.reverse_fallback_secs),
            },
            ManeuverStage {
                label: "rotate",
                action: StageAction::Rotate(rotation, config.rotate_power),
                hold: secs(config.rotate_secs),
                fault_hold,
            },
            ManeuverStage {
                label: "creep-out",
                action: StageAction::Forward(config.creep_power),
                hold: secs(config.creep_secs),
                fault_hold,
            },
            ManeuverStage {
                label: "turn-back",
                action: StageAction::Differential { left, right },
                hold: secs(config.turn_secs),
                fault_hold,
            },
            ManeuverStage {
                label: "creep-in",
                action: StageAction::Forward(config.creep_power),
                hold: secs(config.creep_secs),
                fault_hold,
            },
        ];
        Self::new(stages)
    }

    /// Total hold time when no stage faults.
    pub fn nominal_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.hold).sum()
    }

    pub fn execute<A, C>(&self, actuator: &mut A, clock: &C) -> ManeuverReport
    where
        A: Actuator + ?Sized,
        C: Clock + ?Sized,
    {
        self.logger.record("avoidance sweep started");
        let mut report = ManeuverReport::default();
        let mut guard = StopGuard { actuator };

        for stage in &self.stages {
            match apply(&mut *guard, stage.action) {
                Ok(()) => clock.sleep(stage.hold),
                Err(error) => {
                    self.logger
                        .warn(&format!("stage {} failed: {}; stopping", stage.label, error));
                    if let Err(stop_error) = guard.stop() {
                        self.logger
                            .warn(&format!("stop after {} failed: {}", stage.label, stop_error));
                    }
                    clock.sleep(stage.fault_hold);
                    report.faults.push(StageFault {
                        stage: stage.label,
                        error,
                    });
                }
            }
            report.stages_run += 1;
        }

        drop(guard);
        self.logger.record(&format!(
            "avoidance sweep finished ({} faulted stages)",
            report.faults.len()
        ));
        report
    }
}

impl Default for AvoidanceManeuver {
    fn default() -> Self {
        Self::from_config(&AvoidanceConfig::default())
    }
}

fn apply<A: Actuator + ?Sized>(actuator: &mut A, action: StageAction) -> ActuatorResult {
    match action {
        StageAction::Stop => actuator.stop(),
        StageAction::Reverse(power) => actuator.backward(power),
        StageAction::Rotate(direction, power) => actuator.rotate(direction, power),
        StageAction::Forward(power) => actuator.forward(power),
        StageAction::Differential { left, right } => {
            actuator.set_power(Side::Left, left)?;
            actuator.set_power(Side::Right, right)
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}
