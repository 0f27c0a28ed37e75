use serde::{Deserialize, Serialize};

use crate::hardware::{Actuator, Side};
use crate::prelude::{ControlResult, LaneObservation};
use crate::processing::steering::SteeringController;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveParams {
    pub base_speed: f32,
    pub max_steering: f32,
    pub frame_center_x: i32,
    pub power_ceiling: f32,
    /// Scales the raw PID output before clamping.
    pub damping: f32,
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            base_speed: 70.0,
            max_steering: 27.0,
            frame_center_x: 160,
            power_ceiling: 127.0,
            damping: 0.5,
        }
    }
}

/// Motor command derived from one lane observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    Power { left: i32, right: i32, steering: f32 },
    Stop,
}

/// Differential-drive mixing of base speed and steering.
pub struct DriveMixer {
    params: DriveParams,
}

impl DriveMixer {
    pub fn new(params: DriveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DriveParams {
        &self.params
    }

    /// Computes the command without touching the actuator.
    pub fn mix(&self, observation: &LaneObservation, pid: &mut SteeringController) -> DriveCommand {
        let Some(center_x) = observation.center_x else {
            return DriveCommand::Stop;
        };

        let error = (center_x - self.params.frame_center_x) as f32;
        let limit = self.params.max_steering.abs();
        let mut steering = (pid.compute(error) * self.params.damping).clamp(-limit, limit);
        if observation.stop_line {
            steering = 0.0;
        }

        let ceiling = self.params.power_ceiling.max(0.0);
        let left = (self.params.base_speed + steering).clamp(0.0, ceiling) as i32;
        let right = (self.params.base_speed - steering).clamp(0.0, ceiling) as i32;
        DriveCommand::Power {
            left,
            right,
            steering,
        }
    }

    /// Mixes and issues the command. A lost lane is an unconditional stop.
    pub fn drive<A: Actuator + ?Sized>(
        &self,
        observation: &LaneObservation,
        pid: &mut SteeringController,
        actuator: &mut A,
    ) -> ControlResult<DriveCommand> {
        let command = self.mix(observation, pid);
        match command {
            DriveCommand::Power { left, right, .. } => {
                actuator.set_power(Side::Left, left)?;
                actuator.set_power(Side::Right, right)?;
            }
            DriveCommand::Stop => actuator.stop()?,
        }
        Ok(command)
    }
}

impl Default for DriveMixer {
    fn default() -> Self {
        Self::new(DriveParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{ActuatorCommand, RecordingActuator};

    fn seen(center_x: i32, stop_line: bool) -> LaneObservation {
        LaneObservation {
            center_x: Some(center_x),
            stop_line,
        }
    }

    #[test]
    fn steering_is_clamped_to_max() {
        let mixer = DriveMixer::default();
        let mut pid = SteeringController::default();
        match mixer.mix(&seen(300, false), &mut pid) {
            DriveCommand::Power {
                left,
                right,
                steering,
            } => {
                assert_eq!(steering, 27.0);
                assert_eq!(left, 97);
                assert_eq!(right, 43);
            }
            DriveCommand::Stop => panic!("expected power"),
        }
    }

    #[test]
    fn stop_line_forces_straight_drive() {
        let mixer = DriveMixer::default();
        let mut pid = SteeringController::default();
        let command = mixer.mix(&seen(20, true), &mut pid);
        assert_eq!(
            command,
            DriveCommand::Power {
                left: 70,
                right: 70,
                steering: 0.0
            }
        );
    }

    #[test]
    fn steering_stays_bounded_over_a_sweep() {
        let mixer = DriveMixer::default();
        let mut pid = SteeringController::default();
        for center in (0..320).step_by(7) {
            if let DriveCommand::Power { steering, .. } = mixer.mix(&seen(center, false), &mut pid) {
                assert!(steering.abs() <= 27.0);
            }
        }
    }

    #[test]
    fn powers_respect_ceiling_and_floor() {
        let mixer = DriveMixer::new(DriveParams {
            base_speed: 120.0,
            max_steering: 60.0,
            ..Default::default()
        });
        let mut pid = SteeringController::default();
        if let DriveCommand::Power { left, right, .. } = mixer.mix(&seen(319, false), &mut pid) {
            assert_eq!(left, 127);
            assert_eq!(right, 60);
        } else {
            panic!("expected power");
        }
    }

    #[test]
    fn lost_lane_issues_stop() {
        let mixer = DriveMixer::default();
        let mut pid = SteeringController::default();
        let mut actuator = RecordingActuator::new();
        let command = mixer
            .drive(&LaneObservation::lost(), &mut pid, &mut actuator)
            .unwrap();
        assert_eq!(command, DriveCommand::Stop);
        assert_eq!(actuator.commands(), &[ActuatorCommand::Stop]);
    }

    #[test]
    fn observed_lane_sets_both_sides() {
        let mixer = DriveMixer::default();
        let mut pid = SteeringController::default();
        let mut actuator = RecordingActuator::new();
        mixer.drive(&seen(160, false), &mut pid, &mut actuator).unwrap();
        assert_eq!(
            actuator.commands(),
            &[
                ActuatorCommand::SetPower(Side::Left, 70),
                ActuatorCommand::SetPower(Side::Right, 70),
            ]
        );
    }
}
