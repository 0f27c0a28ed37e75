pub mod client;
pub mod store;

use anyhow::Context;
use image::{GrayImage, ImageFormat};
use log::{info, warn};
use rovercore::mission::{DetectionSnapshot, MissionBrief, MissionReporter, SectorCapture};
use std::fs;
use std::path::{Path, PathBuf};

pub use client::DashboardClient;
pub use store::MissionStore;

/// Mission reporter backed by the local JSON document and, when online, the
/// dashboard server. Every failure is logged and swallowed.
pub struct DashboardReporter {
    store: MissionStore,
    client: Option<DashboardClient>,
    capture_dir: PathBuf,
}

impl DashboardReporter {
    pub fn new(store: MissionStore, client: Option<DashboardClient>, capture_dir: PathBuf) -> Self {
        Self {
            store,
            client,
            capture_dir,
        }
    }

    pub fn store(&self) -> &MissionStore {
        &self.store
    }

    fn publish(&self, points: &[String], detection: &DetectionSnapshot) -> anyhow::Result<()> {
        let mut document = self.store.load();
        document.merge_progress(points, detection);

        if let Some(client) = &self.client {
            let json =
                serde_json::to_string_pretty(&document).context("encoding mission document")?;
            let file_name = format!("{}.json", document.mission_code);
            match client.post_document(&file_name, json) {
                Ok(body) => info!("[report] dashboard accepted {}: {}", file_name, body.trim()),
                Err(err) => warn!("[report] dashboard upload failed: {:#}", err),
            }
        }
        self.store.save(&document)
    }

    fn capture(&self, capture: &SectorCapture<'_>) -> anyhow::Result<PathBuf> {
        let path = self.capture_dir.join(&capture.image_name);
        write_jpeg(&path, capture)?;
        info!("[report] saved {} for {}", path.display(), capture.sector);

        if let Some(client) = &self.client {
            let bytes =
                fs::read(&path).with_context(|| format!("reading back {}", path.display()))?;
            let body = client.send_image(&capture.image_name, bytes)?;
            info!("[report] image {} accepted: {}", capture.image_name, body.trim());
        }
        Ok(path)
    }
}

fn write_jpeg(path: &Path, capture: &SectorCapture<'_>) -> anyhow::Result<()> {
    let (height, width) = capture.frame.dim();
    let pixels: Vec<u8> = capture.frame.iter().copied().collect();
    let image = GrayImage::from_raw(width as u32, height as u32, pixels)
        .with_context(|| format!("frame {}x{} does not fit an image buffer", width, height))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    image
        .save_with_format(path, ImageFormat::Jpeg)
        .with_context(|| format!("writing {}", path.display()))
}

impl MissionReporter for DashboardReporter {
    fn mission_brief(&mut self) -> MissionBrief {
        self.store.load().brief()
    }

    fn send(&mut self, points: &[String], detection: &DetectionSnapshot) {
        if let Err(err) = self.publish(points, detection) {
            warn!("[report] mission update failed: {:#}", err);
        }
    }

    fn capture_sector(&mut self, capture: &SectorCapture<'_>) {
        if let Err(err) = self.capture(capture) {
            warn!("[report] sector {} capture failed: {:#}", capture.sector, err);
        }
    }
}
