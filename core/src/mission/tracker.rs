use std::collections::{HashMap, HashSet};

use ndarray::ArrayView2;

use crate::mission::report::{
    DetectionEntry, DetectionSnapshot, MissionBrief, MissionReporter, SectorCapture,
};
use crate::mission::sighting::{MarkerSighting, TrackedObject};
use crate::mission::table::{MarkerKind, MarkerTable};
use crate::telemetry::log::LogManager;

/// What one marker frame changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerOutcome {
    /// Waypoints reported for the first time, in sighting order.
    pub reported_points: Vec<String>,
    /// Flagged sectors captured for the first time.
    pub captured_sectors: Vec<String>,
}

impl MarkerOutcome {
    pub fn is_empty(&self) -> bool {
        self.reported_points.is_empty() && self.captured_sectors.is_empty()
    }
}

/// Waypoint/sector state machine.
///
/// Visited waypoints and captured sectors only ever grow, so each waypoint is
/// reported and each flagged sector captured at most once per run.
pub struct WaypointTracker {
    table: MarkerTable,
    visited: HashSet<String>,
    visited_order: Vec<String>,
    reported_sectors: HashSet<String>,
    current_point: Option<String>,
    counters: HashMap<String, Vec<DetectionEntry>>,
    logger: LogManager,
}

impl WaypointTracker {
    pub fn new(table: MarkerTable) -> Self {
        Self {
            table,
            visited: HashSet::new(),
            visited_order: Vec::new(),
            reported_sectors: HashSet::new(),
            current_point: None,
            counters: HashMap::new(),
            logger: LogManager::new("mission"),
        }
    }

    /// Visited waypoints in first-visit order.
    pub fn visited(&self) -> &[String] {
        &self.visited_order
    }

    pub fn current_point(&self) -> Option<&str> {
        self.current_point.as_deref()
    }

    pub fn is_sector_reported(&self, sector: &str) -> bool {
        self.reported_sectors.contains(sector)
    }

    /// Applies one frame of marker sightings. Unknown ids are ignored.
    pub fn process_markers<R: MissionReporter + ?Sized>(
        &mut self,
        sightings: &[MarkerSighting],
        frame: ArrayView2<u8>,
        reporter: &mut R,
    ) -> MarkerOutcome {
        let mut outcome = MarkerOutcome::default();
        let mut brief: Option<MissionBrief> = None;

        for sighting in sightings {
            let Some(kind) = self.table.lookup(sighting.id).cloned() else {
                continue;
            };
            match kind {
                MarkerKind::Point { name } => {
                    if self.handle_point(&name, reporter) {
                        outcome.reported_points.push(name);
                    }
                }
                MarkerKind::Sector { name } => {
                    let brief = brief.get_or_insert_with(|| reporter.mission_brief());
                    if self.handle_sector(&name, brief, frame.view(), reporter) {
                        outcome.captured_sectors.push(name);
                    }
                }
            }
        }
        outcome
    }

    fn handle_point<R: MissionReporter + ?Sized>(&mut self, name: &str, reporter: &mut R) -> bool {
        self.current_point = Some(name.to_string());
        if !self.visited.insert(name.to_string()) {
            return false;
        }
        self.visited_order.push(name.to_string());

        let snapshot = self.snapshot();
        self.logger.record(&format!(
            "waypoint {} reached first time; points={:?} detection={:?}",
            name, self.visited_order, snapshot
        ));
        reporter.send(&self.visited_order, &snapshot);
        true
    }

    fn handle_sector<'a, R: MissionReporter + ?Sized>(
        &mut self,
        name: &'a str,
        brief: &MissionBrief,
        frame: ArrayView2<'a, u8>,
        reporter: &mut R,
    ) -> bool {
        self.logger.detail(&format!("sector {} in view", name));
        if !brief.is_flagged(name) || self.reported_sectors.contains(name) {
            return false;
        }
        self.reported_sectors.insert(name.to_string());

        let capture = SectorCapture {
            sector: name,
            image_name: brief.capture_name(name),
            frame,
        };
        self.logger
            .record(&format!("flagged sector {} -> capture {}", name, capture.image_name));
        reporter.capture_sector(&capture);
        true
    }

    /// Counts one detection of `class_name` against the current waypoint.
    ///
    /// Before any waypoint is sighted, the first point in table order becomes
    /// the current waypoint so that no detection goes unattributed.
    pub fn update_detection(&mut self, class_name: &str) {
        if self.current_point.is_none() {
            match self.table.default_point() {
                Some(default) => {
                    self.logger
                        .record(&format!("no waypoint yet; attributing to {}", default));
                    self.current_point = Some(default.to_string());
                }
                None => {
                    self.logger
                        .warn(&format!("no point in marker table; dropping {}", class_name));
                    return;
                }
            }
        }
        let Some(point) = self.current_point.clone() else {
            return;
        };

        let entries = self.counters.entry(point).or_default();
        match entries.iter_mut().find(|entry| entry.class_name == class_name) {
            Some(entry) => entry.count += 1,
            None => entries.push(DetectionEntry {
                class_name: class_name.to_string(),
                count: 1,
            }),
        }
    }

    pub fn record_objects(&mut self, objects: &[TrackedObject]) {
        for object in objects {
            self.update_detection(&object.class_name);
        }
    }

    /// Non-zero counts for every visited waypoint, in first-visit order.
    pub fn snapshot(&self) -> DetectionSnapshot {
        let mut snapshot = DetectionSnapshot::new();
        for point in &self.visited_order {
            let entries = self
                .counters
                .get(point)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|entry| entry.count > 0)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            snapshot.insert(point.clone(), entries);
        }
        snapshot
    }
}

impl Default for WaypointTracker {
    fn default() -> Self {
        Self::new(MarkerTable::default())
    }
}
