pub mod avoidance;
pub mod hazard;
pub mod lane;
pub mod mixer;
pub mod steering;

pub use avoidance::{AvoidanceConfig, AvoidanceManeuver, AvoidanceSide, ManeuverReport};
pub use hazard::{HazardConfig, HazardDecision, HazardMonitor, HazardState};
pub use lane::{LaneTracker, LaneTrackerConfig, RoiGeometry};
pub use mixer::{DriveCommand, DriveMixer, DriveParams};
pub use steering::{PidGains, SteeringController};
