pub mod actuator;
pub mod clock;
pub mod mock;

pub use actuator::{Actuator, ActuatorError, ActuatorResult, Direction, Side};
pub use clock::{Clock, ManualClock, SystemClock};
pub use mock::{ActuatorCommand, CommandKind, RecordingActuator};
