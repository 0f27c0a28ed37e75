pub mod report;
pub mod sighting;
pub mod table;
pub mod tracker;

pub use report::{
    DetectionEntry, DetectionSnapshot, MissionBrief, MissionDocument, MissionReporter,
    SectorCapture, DEFAULT_MISSION_CODE,
};
pub use sighting::{BoundingBox, MarkerSighting, TrackedObject};
pub use table::{MarkerEntry, MarkerKind, MarkerTable};
pub use tracker::{MarkerOutcome, WaypointTracker};
