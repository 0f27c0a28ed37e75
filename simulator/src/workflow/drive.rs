use log::debug;
use rovercore::hardware::{Actuator, ActuatorError, ActuatorResult, Direction, Side};
use serde::{Deserialize, Serialize};

/// Last power applied to each side, in motor-board units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPowers {
    pub left: i32,
    pub right: i32,
}

/// Stand-in for the motor board: tracks wheel powers and logs each command.
#[derive(Debug, Default)]
pub struct SimulatedDrive {
    powers: WheelPowers,
    commands: usize,
    reverse_unsupported: bool,
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emulates a board without a reverse channel.
    pub fn without_reverse() -> Self {
        Self {
            reverse_unsupported: true,
            ..Self::default()
        }
    }

    pub fn powers(&self) -> WheelPowers {
        self.powers
    }

    pub fn commands(&self) -> usize {
        self.commands
    }

    fn apply(&mut self, left: i32, right: i32) {
        self.powers = WheelPowers { left, right };
        self.commands += 1;
        debug!("[drive] left={} right={}", left, right);
    }
}

impl Actuator for SimulatedDrive {
    fn set_power(&mut self, side: Side, power: i32) -> ActuatorResult {
        match side {
            Side::Left => self.apply(power, self.powers.right),
            Side::Right => self.apply(self.powers.left, power),
        }
        Ok(())
    }

    fn stop(&mut self) -> ActuatorResult {
        self.apply(0, 0);
        Ok(())
    }

    fn rotate(&mut self, direction: Direction, power: i32) -> ActuatorResult {
        match direction {
            Direction::Clockwise => self.apply(power, -power),
            Direction::CounterClockwise => self.apply(-power, power),
        }
        Ok(())
    }

    fn forward(&mut self, power: i32) -> ActuatorResult {
        self.apply(power, power);
        Ok(())
    }

    fn backward(&mut self, power: i32) -> ActuatorResult {
        if self.reverse_unsupported {
            return Err(ActuatorError::Unsupported("backward"));
        }
        self.apply(-power, -power);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_drives_sides_in_opposition() {
        let mut drive = SimulatedDrive::new();
        drive.rotate(Direction::CounterClockwise, 25).unwrap();
        assert_eq!(drive.powers(), WheelPowers { left: -25, right: 25 });
        drive.stop().unwrap();
        assert_eq!(drive.powers(), WheelPowers::default());
    }

    #[test]
    fn reverse_can_be_unsupported() {
        let mut drive = SimulatedDrive::without_reverse();
        assert_eq!(
            drive.backward(50),
            Err(ActuatorError::Unsupported("backward"))
        );
        assert_eq!(drive.commands(), 0);
    }
}
