use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::RecorderConfig;

/// Current sidecar schema version, bumped on incompatible field changes.
pub const METADATA_SCHEMA_VERSION: u32 = 1;

/// Result returned when a recording session stops successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub schema_version: u32,
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub created_at: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl RecordingMetadata {
    pub fn new(duration_secs: f64, file_path: &str, checksum: &str, config: &RecorderConfig) -> Self {
        Self {
            schema_version: METADATA_SCHEMA_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs,
            file_path: file_path.to_string(),
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            bit_depth: config.bit_depth,
        }
    }
}
