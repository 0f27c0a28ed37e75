use serde::{Deserialize, Serialize};

/// A marker resolved by the external detector: id plus corner polygon in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSighting {
    pub id: u32,
    #[serde(default)]
    pub corners: [(f32, f32); 4],
}

impl MarkerSighting {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            corners: [(0.0, 0.0); 4],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Labeled detection from the object tracker, already deduplicated by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedObject {
    #[serde(default)]
    pub track_id: Option<u32>,
    pub class_name: String,
    #[serde(default)]
    pub bbox: BoundingBox,
}

impl TrackedObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            track_id: None,
            class_name: class_name.into(),
            bbox: BoundingBox::default(),
        }
    }
}
