use std::collections::HashSet;

use super::actuator::{Actuator, ActuatorError, ActuatorResult, Direction, Side};

/// Command issued to a [`RecordingActuator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    SetPower(Side, i32),
    Stop,
    Rotate(Direction, i32),
    Forward(i32),
    Backward(i32),
}

impl ActuatorCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            ActuatorCommand::SetPower(..) => CommandKind::SetPower,
            ActuatorCommand::Stop => CommandKind::Stop,
            ActuatorCommand::Rotate(..) => CommandKind::Rotate,
            ActuatorCommand::Forward(_) => CommandKind::Forward,
            ActuatorCommand::Backward(_) => CommandKind::Backward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetPower,
    Stop,
    Rotate,
    Forward,
    Backward,
}

/// Test double that records accepted commands and fails on demand.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    commands: Vec<ActuatorCommand>,
    failing: HashSet<CommandKind>,
    rejected: usize,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent command of `kind` fail with a fault.
    pub fn fail_on(&mut self, kind: CommandKind) {
        self.failing.insert(kind);
    }

    pub fn commands(&self) -> &[ActuatorCommand] {
        &self.commands
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn last(&self) -> Option<ActuatorCommand> {
        self.commands.last().copied()
    }

    fn issue(&mut self, command: ActuatorCommand) -> ActuatorResult {
        if self.failing.contains(&command.kind()) {
            self.rejected += 1;
            return Err(ActuatorError::Fault(format!("{:?} rejected", command)));
        }
        self.commands.push(command);
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn set_power(&mut self, side: Side, power: i32) -> ActuatorResult {
        self.issue(ActuatorCommand::SetPower(side, power))
    }

    fn stop(&mut self) -> ActuatorResult {
        self.issue(ActuatorCommand::Stop)
    }

    fn rotate(&mut self, direction: Direction, power: i32) -> ActuatorResult {
        self.issue(ActuatorCommand::Rotate(direction, power))
    }

    fn forward(&mut self, power: i32) -> ActuatorResult {
        self.issue(ActuatorCommand::Forward(power))
    }

    fn backward(&mut self, power: i32) -> ActuatorResult {
        self.issue(ActuatorCommand::Backward(power))
    }
}
