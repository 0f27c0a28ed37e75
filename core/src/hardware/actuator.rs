use serde::{Deserialize, Serialize};

/// Drive side of the differential base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// In-place rotation direction, viewed from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("command not supported by actuator: {0}")]
    Unsupported(&'static str),
    #[error("actuator fault: {0}")]
    Fault(String),
}

pub type ActuatorResult = Result<(), ActuatorError>;

/// Motor capability interface implemented by the hardware adapter.
///
/// Power values use the motor board's native scale (0..=127 for the drive
/// base this was tuned on).
pub trait Actuator {
    fn set_power(&mut self, side: Side, power: i32) -> ActuatorResult;
    fn stop(&mut self) -> ActuatorResult;
    fn rotate(&mut self, direction: Direction, power: i32) -> ActuatorResult;
    fn forward(&mut self, power: i32) -> ActuatorResult;
    fn backward(&mut self, power: i32) -> ActuatorResult;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn set_power(&mut self, side: Side, power: i32) -> ActuatorResult {
        (**self).set_power(side, power)
    }

    fn stop(&mut self) -> ActuatorResult {
        (**self).stop()
    }

    fn rotate(&mut self, direction: Direction, power: i32) -> ActuatorResult {
        (**self).rotate(direction, power)
    }

    fn forward(&mut self, power: i32) -> ActuatorResult {
        (**self).forward(power)
    }

    fn backward(&mut self, power: i32) -> ActuatorResult {
        (**self).backward(power)
    }
}
