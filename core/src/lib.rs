//! Control core for the autonomous lane-following rover.
//!
//! The modules cover the per-frame decision logic: lane-center estimation and
//! PID steering, pothole detection with its open-loop avoidance maneuver, and
//! the waypoint/sector mission state machine. Camera acquisition, marker
//! decoding, object classification and report transport stay behind the
//! collaborator traits in [`prelude`] and [`mission`].

pub mod hardware;
pub mod math;
pub mod mission;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{ControlError, ControlResult, Frame, LaneObservation, RoadMask};
