use anyhow::Context;
use rovercore::mission::{MarkerEntry, MarkerTable};
use rovercore::processing::{
    AvoidanceConfig, DriveParams, HazardConfig, LaneTrackerConfig, PidGains, RoiGeometry,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Mission persistence and transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub document_path: PathBuf,
    pub server_url: Option<String>,
    pub timeout_secs: u64,
    pub capture_dir: PathBuf,
    /// Object detections are pulled every this many frames.
    pub detection_interval: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("report/A3R8.json"),
            server_url: None,
            timeout_secs: 10,
            capture_dir: PathBuf::from("/tmp"),
            detection_interval: 5,
        }
    }
}

/// Every tunable of the rover, loaded from one YAML document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub drive: DriveParams,
    pub pid: PidGains,
    pub lane: LaneTrackerConfig,
    pub roi: RoiGeometry,
    pub hazard: HazardConfig,
    pub avoidance: AvoidanceConfig,
    pub markers: Vec<MarkerEntry>,
    pub mission: MissionConfig,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            drive: DriveParams::default(),
            pid: PidGains::default(),
            lane: LaneTrackerConfig::default(),
            roi: RoiGeometry::default(),
            hazard: HazardConfig::default(),
            avoidance: AvoidanceConfig::default(),
            markers: MarkerTable::default_entries(),
            mission: MissionConfig::default(),
        }
    }
}

impl RoverConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading rover config {}", path_ref.display()))?;
        let config: RoverConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing rover config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn marker_table(&self) -> anyhow::Result<MarkerTable> {
        MarkerTable::new(self.markers.clone()).context("validating marker table")
    }
}
