//! JSON sidecar persistence for recording metadata.
//!
//! Every finished recording gets a `<name>.metadata.json` file next to
//! it. The sidecar is staged in a temp file and renamed into place, so a
//! crash mid-write never leaves a truncated sidecar behind.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for the recording at `recording_path`.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

impl RecordingMetadata {
    /// Persist this metadata beside its recording.
    pub fn save_beside(&self, recording_path: &Path) -> Result<(), RecorderError> {
        let target = sidecar_path(recording_path);
        let staged = target.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| RecorderError::Storage(format!("metadata encode failed: {}", e)))?;
        fs::write(&staged, json)
            .map_err(|e| RecorderError::Storage(format!("metadata stage failed: {}", e)))?;
        fs::rename(&staged, &target)
            .map_err(|e| RecorderError::Storage(format!("metadata rename failed: {}", e)))?;
        Ok(())
    }

    /// Load the sidecar for the recording at `recording_path`.
    pub fn load_beside(recording_path: &Path) -> Result<Self, RecorderError> {
        let json = fs::read_to_string(sidecar_path(recording_path))
            .map_err(|e| RecorderError::Storage(format!("metadata read failed: {}", e)))?;
        serde_json::from_str(&json)
            .map_err(|e| RecorderError::Storage(format!("metadata decode failed: {}", e)))
    }
}
