use std::path::PathBuf;

/// Configuration for a recording session.
///
/// Capture runs at fixed parameters: the mixer operates on 16-bit
/// little-endian mono PCM, so `validate` rejects anything else.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Sample rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Bit depth for PCM output. Only 16 is supported.
    pub bit_depth: u16,

    /// Number of channels. Only mono (1) is supported.
    pub channels: u16,

    /// Directory where default-named recording files are written.
    pub output_directory: PathBuf,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.bit_depth != 16 {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.channels != 1 {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        Ok(())
    }

    /// Bytes of PCM data per second at these parameters.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bit_depth as u32 / 8
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            bit_depth: 16,
            channels: 1,
            output_directory: PathBuf::from("."),
        }
    }
}

/// Options accepted by `RecordingSession::start`.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Output file path. When `None`, a timestamped file is created under
    /// the configured output directory.
    pub path: Option<PathBuf>,
}
