use anyhow::Context;
use log::{info, warn};
use rovercore::mission::MissionDocument;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON mission document on local disk.
#[derive(Debug, Clone)]
pub struct MissionStore {
    path: PathBuf,
}

impl MissionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document. A missing or unreadable file yields the default
    /// document so the mission keeps running.
    pub fn load(&self) -> MissionDocument {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    "[store] {} unavailable ({}); using default mission",
                    self.path.display(),
                    err
                );
                return MissionDocument::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "[store] {} is malformed ({}); using default mission",
                self.path.display(),
                err
            );
            MissionDocument::default()
        })
    }

    pub fn save(&self, document: &MissionDocument) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(document).context("encoding mission document")?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing mission document {}", self.path.display()))?;
        Ok(())
    }

    /// Writes a fresh document flagging `fire_buildings` unless one exists.
    pub fn seed_if_missing(&self, fire_buildings: &[String]) -> anyhow::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let document = MissionDocument {
            fire_buildings: fire_buildings.to_vec(),
            ..MissionDocument::default()
        };
        self.save(&document)?;
        info!(
            "[store] seeded {} with flagged sectors {:?}",
            self.path.display(),
            fire_buildings
        );
        Ok(true)
    }
}
