use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::hardware::ActuatorError;
use crate::mission::{MarkerSighting, TrackedObject};

/// Binary road mask. Any non-zero cell is foreground (candidate lane surface).
pub type RoadMask = Array2<u8>;

/// Lane estimate produced once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneObservation {
    /// Lane center in full-frame pixel coordinates, `None` when no lane pixel is visible.
    pub center_x: Option<i32>,
    /// A wide, flat foreground blob was seen (lane-crossing bar).
    pub stop_line: bool,
}

impl LaneObservation {
    pub fn lost() -> Self {
        Self::default()
    }

    pub fn is_lost(&self) -> bool {
        self.center_x.is_none()
    }
}

/// One frame handed over by the frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RoadMask,
}

/// Common error type for the control core.
#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("empty region: {0}")]
    EmptyRegion(String),
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

pub type ControlResult<T> = Result<T, ControlError>;

/// Blocking frame supplier. `None` ends the run.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Resolves marker ids and corner polygons for a frame.
pub trait MarkerDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<MarkerSighting>;
}

/// Labeled, identity-deduplicated objects for a frame.
pub trait ObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<TrackedObject>;
}
