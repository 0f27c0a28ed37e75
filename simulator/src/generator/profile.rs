use crate::generator::template;
use anyhow::Context;
use ndarray::Array2;
use rand::{rngs::StdRng, SeedableRng};
use rovercore::mission::{MarkerSighting, TrackedObject};
use rovercore::prelude::{Frame, FrameSource, MarkerDetector, ObjectDetector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

/// Inclusive range of frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpan {
    pub start: u64,
    pub end: u64,
}

impl FrameSpan {
    pub fn contains(&self, index: u64) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedMarkers {
    pub frame: u64,
    pub ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedObjects {
    pub frame: u64,
    pub classes: Vec<String>,
}

/// Synthetic course driven by the offline simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub width: usize,
    pub height: usize,
    pub frames: u64,
    pub seed: u64,
    pub lane_center: f32,
    pub lane_half_width: usize,
    pub drift_amplitude: f32,
    /// Frames per full drift oscillation.
    pub drift_period: f32,
    pub speckle: f32,
    pub stop_lines: Vec<u64>,
    pub potholes: Vec<FrameSpan>,
    pub markers: Vec<ScriptedMarkers>,
    pub objects: Vec<ScriptedObjects>,
    /// Sectors flagged in a freshly seeded mission document.
    pub fire_buildings: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let markers = [
            (20, vec![1]),
            (90, vec![2]),
            (150, vec![8]),
            (210, vec![11]),
            (260, vec![11]),
            (300, vec![9]),
            (360, vec![10]),
            (420, vec![8]),
            (540, vec![13]),
        ];
        let objects = [
            (10, vec!["tank"]),
            (60, vec!["car", "car"]),
            (170, vec!["enemy"]),
            (380, vec!["box", "hazmat"]),
        ];
        Self {
            width: 320,
            height: 240,
            frames: 600,
            seed: 0,
            lane_center: 160.0,
            lane_half_width: 6,
            drift_amplitude: 30.0,
            drift_period: 240.0,
            speckle: 0.002,
            stop_lines: vec![500, 501, 502],
            potholes: vec![FrameSpan {
                start: 240,
                end: 249,
            }],
            markers: markers
                .into_iter()
                .map(|(frame, ids)| ScriptedMarkers { frame, ids })
                .collect(),
            objects: objects
                .into_iter()
                .map(|(frame, classes)| ScriptedObjects {
                    frame,
                    classes: classes.into_iter().map(String::from).collect(),
                })
                .collect(),
            fire_buildings: vec!["sector8".to_string()],
        }
    }
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario {}", path_ref.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path_ref.display()))
    }

    fn lane_center_at(&self, index: u64) -> f32 {
        if self.drift_period <= 0.0 {
            return self.lane_center;
        }
        let phase = index as f32 / self.drift_period * 2.0 * PI;
        self.lane_center + self.drift_amplitude * phase.sin()
    }
}

/// Renders the road mask for frame `index`.
pub fn render_frame(config: &ScenarioConfig, index: u64, rng: &mut StdRng) -> Array2<u8> {
    let (height, width) = (config.height, config.width);
    let mut mask = Array2::<u8>::zeros((height, width));
    let center_x = config.lane_center_at(index);
    if config.stop_lines.contains(&index) {
        // The stripe ends at the crossing bar.
        template::stop_bar(&mut mask, height * 3 / 4, (height / 24).max(1));
    } else {
        template::lane_stripe(&mut mask, center_x, config.lane_half_width);
    }
    if config.potholes.iter().any(|span| span.contains(index)) {
        // Dark blob over the lane, leaving a sliver at the bottom edge.
        let center = (height * 4 / 5, center_x.max(0.0) as usize);
        template::disc(&mut mask, center, height / 6, 0);
    }
    template::speckle(&mut mask, rng, config.speckle);
    mask
}

/// Seeded camera stand-in producing road masks.
pub struct SyntheticCamera {
    config: ScenarioConfig,
    rng: StdRng,
    next_index: u64,
}

impl SyntheticCamera {
    pub fn new(config: ScenarioConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            next_index: 0,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.next_index >= self.config.frames {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        let image = render_frame(&self.config, index, &mut self.rng);
        Some(Frame { index, image })
    }
}

/// Marker detector replaying scripted sightings by frame index.
pub struct ScriptedMarkerDetector {
    by_frame: HashMap<u64, Vec<u32>>,
}

impl ScriptedMarkerDetector {
    pub fn new(script: &[ScriptedMarkers]) -> Self {
        let mut by_frame: HashMap<u64, Vec<u32>> = HashMap::new();
        for entry in script {
            by_frame
                .entry(entry.frame)
                .or_default()
                .extend(entry.ids.iter().copied());
        }
        Self { by_frame }
    }
}

impl MarkerDetector for ScriptedMarkerDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<MarkerSighting> {
        self.by_frame
            .get(&frame.index)
            .map(|ids| ids.iter().map(|&id| MarkerSighting::new(id)).collect())
            .unwrap_or_default()
    }
}

/// Object tracker replaying scripted classes. Each scripted object is
/// returned once, at the first poll on or after its frame.
pub struct ScriptedObjectDetector {
    pending: BTreeMap<u64, Vec<String>>,
    next_track_id: u32,
}

impl ScriptedObjectDetector {
    pub fn new(script: &[ScriptedObjects]) -> Self {
        let mut pending: BTreeMap<u64, Vec<String>> = BTreeMap::new();
        for entry in script {
            pending
                .entry(entry.frame)
                .or_default()
                .extend(entry.classes.iter().cloned());
        }
        Self {
            pending,
            next_track_id: 1,
        }
    }
}

impl ObjectDetector for ScriptedObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Vec<TrackedObject> {
        let due: Vec<u64> = self
            .pending
            .range(..=frame.index)
            .map(|(&index, _)| index)
            .collect();
        let mut objects = Vec::new();
        for index in due {
            for class_name in self.pending.remove(&index).unwrap_or_default() {
                let mut object = TrackedObject::new(class_name);
                object.track_id = Some(self.next_track_id);
                self.next_track_id += 1;
                objects.push(object);
            }
        }
        objects
    }
}
