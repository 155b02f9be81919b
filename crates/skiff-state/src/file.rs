//! StateFile — JSON persistence for the cluster record.
//!
//! Load returns the zero-value state when the file is absent. Save
//! writes to a sibling temp file and renames it over the target, so a
//! crash mid-write never leaves a half-written state file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::ClusterState;

/// Handle to the on-disk cluster state.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or the zero-value state if absent.
    pub fn load(&self) -> StateResult<ClusterState> {
        if !self.path.exists() {
            debug!(path = ?self.path, "no state file, starting from zero-value state");
            return Ok(ClusterState::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| StateError::Read(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| StateError::Deserialize(e.to_string()))
    }

    /// Persist the state atomically (temp file + rename).
    pub fn save(&self, state: &ClusterState) -> StateResult<()> {
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::Write(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| StateError::Write(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StateError::Write(e.to_string()))?;
        debug!(path = ?self.path, nodes = state.nodes.len(), "state saved");
        Ok(())
    }
}
