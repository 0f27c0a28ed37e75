use std::fmt;

use ndarray::ArrayView2;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DEFAULT_MISSION_CODE: &str = "A3R8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEntry {
    #[serde(rename = "type")]
    pub class_name: String,
    pub count: u32,
}

/// Per-waypoint detection counts, in first-visit order.
///
/// Serialized as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionSnapshot {
    waypoints: Vec<(String, Vec<DetectionEntry>)>,
}

impl DetectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a waypoint, replacing its entries if it is already present.
    pub fn insert(&mut self, waypoint: impl Into<String>, entries: Vec<DetectionEntry>) {
        let waypoint = waypoint.into();
        if let Some(slot) = self.waypoints.iter_mut().find(|(name, _)| *name == waypoint) {
            slot.1 = entries;
        } else {
            self.waypoints.push((waypoint, entries));
        }
    }

    pub fn get(&self, waypoint: &str) -> Option<&[DetectionEntry]> {
        self.waypoints
            .iter()
            .find(|(name, _)| name == waypoint)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &str> {
        self.waypoints.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DetectionEntry])> {
        self.waypoints
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl Serialize for DetectionSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.waypoints.len()))?;
        for (name, entries) in &self.waypoints {
            map.serialize_entry(name, entries)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DetectionSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = DetectionSnapshot;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of waypoint name to detection entries")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut snapshot = DetectionSnapshot::new();
                while let Some((name, entries)) =
                    access.next_entry::<String, Vec<DetectionEntry>>()?
                {
                    snapshot.insert(name, entries);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

/// Mission state document shared with the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionDocument {
    pub mission_code: String,
    pub fire_buildings: Vec<String>,
    pub points: Vec<String>,
    pub detection: DetectionSnapshot,
}

impl Default for MissionDocument {
    fn default() -> Self {
        Self {
            mission_code: DEFAULT_MISSION_CODE.to_string(),
            fire_buildings: Vec::new(),
            points: Vec::new(),
            detection: DetectionSnapshot::new(),
        }
    }
}

impl MissionDocument {
    pub fn brief(&self) -> MissionBrief {
        MissionBrief {
            mission_code: self.mission_code.clone(),
            fire_buildings: self.fire_buildings.clone(),
        }
    }

    /// Replaces progress fields; mission code and flagged sectors are kept verbatim.
    pub fn merge_progress(&mut self, points: &[String], detection: &DetectionSnapshot) {
        self.points = points.to_vec();
        self.detection = detection.clone();
    }
}

/// The externally owned part of the mission: its code and flagged sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionBrief {
    pub mission_code: String,
    pub fire_buildings: Vec<String>,
}

impl MissionBrief {
    pub fn is_flagged(&self, sector: &str) -> bool {
        self.fire_buildings.iter().any(|name| name == sector)
    }

    /// `{code}_sector{n}.jpg` from the first digit run of the sector name.
    pub fn capture_name(&self, sector: &str) -> String {
        let digits: String = sector
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            format!("{}_{}.jpg", self.mission_code, sector)
        } else {
            format!("{}_sector{}.jpg", self.mission_code, digits)
        }
    }
}

impl Default for MissionBrief {
    fn default() -> Self {
        MissionDocument::default().brief()
    }
}

/// Hazard-capture request for a flagged sector.
#[derive(Debug, Clone)]
pub struct SectorCapture<'a> {
    pub sector: &'a str,
    pub image_name: String,
    pub frame: ArrayView2<'a, u8>,
}

/// External collaborator that persists and transmits mission progress.
///
/// Implementations must not fail the caller: transport problems are logged
/// and dropped on their side.
pub trait MissionReporter {
    /// Current mission code and flagged sectors.
    fn mission_brief(&mut self) -> MissionBrief;
    fn send(&mut self, points: &[String], detection: &DetectionSnapshot);
    fn capture_sector(&mut self, capture: &SectorCapture<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(class_name: &str, count: u32) -> DetectionEntry {
        DetectionEntry {
            class_name: class_name.into(),
            count,
        }
    }

    #[test]
    fn snapshot_serializes_in_visit_order() {
        let mut snapshot = DetectionSnapshot::new();
        snapshot.insert("Charlie", vec![]);
        snapshot.insert("Alpha", vec![entry("tank", 2)]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"Charlie":[],"Alpha":[{"type":"tank","count":2}]}"#);
    }

    #[test]
    fn document_fills_missing_fields_with_defaults() {
        let doc: MissionDocument =
            serde_json::from_str(r#"{"fire_buildings": ["sector8"]}"#).unwrap();
        assert_eq!(doc.mission_code, DEFAULT_MISSION_CODE);
        assert!(doc.brief().is_flagged("sector8"));
        assert!(doc.points.is_empty());
    }

    #[test]
    fn merge_keeps_code_and_flagged_sectors() {
        let mut doc = MissionDocument {
            mission_code: "Z9".into(),
            fire_buildings: vec!["sector2".into()],
            points: vec!["Old".into()],
            detection: DetectionSnapshot::new(),
        };
        let mut snapshot = DetectionSnapshot::new();
        snapshot.insert("Alpha", vec![entry("car", 1)]);
        doc.merge_progress(&["Alpha".to_string()], &snapshot);

        assert_eq!(doc.mission_code, "Z9");
        assert_eq!(doc.fire_buildings, vec!["sector2".to_string()]);
        assert_eq!(doc.points, vec!["Alpha".to_string()]);
        assert_eq!(doc.detection.get("Alpha"), Some(&[entry("car", 1)][..]));

        let round: MissionDocument =
            serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(round, doc);
    }

    #[test]
    fn capture_names_use_sector_digits() {
        let brief = MissionBrief::default();
        assert_eq!(brief.capture_name("sector8"), "A3R8_sector8.jpg");
        assert_eq!(brief.capture_name("north"), "A3R8_north.jpg");
    }
}
