// scout_core/src/mapping/store.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::WaypointMap;
use crate::error::StoreError;

/// File-backed persistence for the waypoint map and its Home node.
#[derive(Debug, Clone)]
pub struct MapStore {
    path: PathBuf,
}

impl MapStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored map. A missing file is not an error.
    pub fn load(&self) -> Result<Option<WaypointMap>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored map");
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let map: WaypointMap =
            serde_json::from_str(&text).map_err(|source| StoreError::Format {
                path: self.path.display().to_string(),
                source,
            })?;
        info!(path = %self.path.display(), waypoints = map.len(), "loaded map");
        Ok(Some(map))
    }

    /// The stored map if there is one, otherwise `fallback`.
    pub fn load_or(&self, fallback: WaypointMap) -> Result<WaypointMap, StoreError> {
        Ok(self.load()?.unwrap_or(fallback))
    }

    /// Writes the map next to its final location, then renames it into place so
    /// a crash never leaves a half-written file behind.
    pub fn save(&self, map: &WaypointMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let text = serde_json::to_string_pretty(map).map_err(|source| StoreError::Format {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;
        info!(path = %self.path.display(), waypoints = map.len(), "saved map");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
